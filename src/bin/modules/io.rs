use super::cli::OutputFormat;
use super::error::CliError;
use eeq::elements::{atomic_number_to_symbol, parse_element};
use eeq::math::constants::HARTREE_TO_EV;
use eeq::{Atom, Dtype};
use prettytable::*;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Prefix marking a ghost atom in the element column, e.g. `@H`.
const GHOST_PREFIX: char = '@';

/// Per-atom results of one molecule, ready for printing.
pub struct ChargeReport<'a> {
    pub atoms: &'a [Atom],
    pub charges: Vec<f64>,
    pub energies: Vec<f64>,
    pub energy: f64,
    pub dtype: Dtype,
}

pub fn read_atoms(input_spec: &str) -> Result<(Vec<Atom>, String), CliError> {
    let reader: Box<dyn BufRead> = if input_spec == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = std::fs::File::open(input_spec).map_err(|e| CliError::Io {
            path: PathBuf::from(input_spec),
            source: e,
        })?;
        Box::new(BufReader::new(file))
    };
    parse_xyz(reader, input_spec)
}

pub fn parse_xyz<R: BufRead>(
    reader: R,
    source_name: &str,
) -> Result<(Vec<Atom>, String), CliError> {
    let parse_error = |details: String| CliError::XyzParse {
        source_name: source_name.to_string(),
        details,
    };

    let mut lines = reader.lines();

    let num_atoms_line = lines
        .next()
        .ok_or_else(|| parse_error("Missing number of atoms line".to_string()))??;
    let num_atoms: usize = num_atoms_line
        .trim()
        .parse()
        .map_err(|_| parse_error(format!("Invalid number of atoms: {}", num_atoms_line)))?;

    let comment = lines
        .next()
        .ok_or_else(|| parse_error("Missing comment line".to_string()))??;

    let mut atoms = Vec::with_capacity(num_atoms);
    for (i, line) in lines.enumerate() {
        if i >= num_atoms {
            break;
        }
        let line = line.map_err(|e| parse_error(format!("Error reading line {}: {}", i + 3, e)))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(parse_error(format!(
                "Line {}: expected at least 4 fields, got {}",
                i + 3,
                parts.len()
            )));
        }

        let (token, ghost) = match parts[0].strip_prefix(GHOST_PREFIX) {
            Some(rest) => (rest, true),
            None => (parts[0], false),
        };
        let atomic_number = parse_element(token)
            .ok_or_else(|| parse_error(format!("Unknown element: {}", parts[0])))?;

        let mut position = [0.0; 3];
        for (k, axis) in ["x", "y", "z"].iter().enumerate() {
            position[k] = parts[k + 1].parse().map_err(|_| {
                parse_error(format!("Invalid {} coordinate: {}", axis, parts[k + 1]))
            })?;
        }

        atoms.push(if ghost {
            Atom::ghost(atomic_number, position)
        } else {
            Atom::new(atomic_number, position)
        });
    }

    if atoms.len() != num_atoms {
        return Err(parse_error(format!(
            "Expected {} atoms, got {}",
            num_atoms,
            atoms.len()
        )));
    }

    Ok((atoms, comment))
}

pub fn get_writer(output_path: &Option<PathBuf>) -> Result<Box<dyn Write>, CliError> {
    match output_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| CliError::Io {
                path: path.clone(),
                source: e,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

pub fn write_results(
    mut writer: Box<dyn Write>,
    report: &ChargeReport<'_>,
    comment: &str,
    format: &OutputFormat,
    precision: usize,
    source_name: &str,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Pretty => write_pretty_table(&mut writer, report, precision, source_name),
        OutputFormat::Xyz => write_xyz_charged(&mut writer, report, comment, precision),
        OutputFormat::Csv => write_csv(&mut writer, report, precision),
        OutputFormat::Json => write_json(&mut writer, report, precision),
    }?;
    writer.flush()?;
    Ok(())
}

fn label(atom: &Atom) -> String {
    let symbol = atomic_number_to_symbol(atom.atomic_number).unwrap_or("??");
    if atom.ghost {
        format!("{GHOST_PREFIX}{symbol}")
    } else {
        symbol.to_string()
    }
}

fn write_pretty_table(
    writer: &mut dyn Write,
    report: &ChargeReport<'_>,
    precision: usize,
    source_name: &str,
) -> Result<(), CliError> {
    let box_format = format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Title],
            format::LineSeparator::new('═', '╪', '╞', '╡'),
        )
        .separators(
            &[format::LinePosition::Intern],
            format::LineSeparator::new('─', '┼', '├', '┤'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build();

    let no_intern_format = format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build();

    let total_charge = report.charges.iter().sum::<f64>();
    let n_ghosts = report.atoms.iter().filter(|a| a.ghost).count();

    let mut title_table = Table::new();
    title_table.set_format(box_format);
    title_table.add_row(row![bc->"EEQ Partial Charge Results"]);
    title_table.print(writer)?;
    writeln!(writer)?;

    let mut summary_table = Table::new();
    summary_table.set_format(no_intern_format);
    summary_table.add_row(row![b->"Source File:", source_name]);
    summary_table.add_row(row![b->"Total Atoms:", report.atoms.len()]);
    summary_table.add_row(row![b->"Ghost Atoms:", n_ghosts]);
    summary_table.add_row(row![b->"Precision:", report.dtype]);
    summary_table
        .add_row(row![b->"Total Charge:", format!("{:.prec$} e", total_charge, prec = precision)]);
    summary_table.add_row(row![b->"EEQ Energy:", format!(
        "{:.prec$} Eh ({:.prec$} eV)",
        report.energy,
        report.energy * HARTREE_TO_EV,
        prec = precision
    )]);
    summary_table.print(writer)?;
    writeln!(writer)?;

    let mut data_table = Table::new();
    data_table.set_format(box_format);
    data_table.set_titles(row![
        bc->"Index", bc->"Element", bc->"X (Å)", bc->"Y (Å)", bc->"Z (Å)",
        bc->"Charge (e)", bc->"Energy (Eh)"
    ]);

    for (i, atom) in report.atoms.iter().enumerate() {
        data_table.add_row(row![
            r->i,
            l->label(atom),
            r->format!("{:.prec$}", atom.position[0], prec = precision),
            r->format!("{:.prec$}", atom.position[1], prec = precision),
            r->format!("{:.prec$}", atom.position[2], prec = precision),
            r->format!("{:.prec$}", report.charges[i], prec = precision),
            r->format!("{:.prec$}", report.energies[i], prec = precision)
        ]);
    }

    data_table.print(writer)?;

    Ok(())
}

fn write_xyz_charged(
    writer: &mut dyn Write,
    report: &ChargeReport<'_>,
    comment: &str,
    precision: usize,
) -> Result<(), CliError> {
    writeln!(writer, "{}", report.atoms.len())?;
    writeln!(
        writer,
        "{} | EEQ charges | energy: {:.*}",
        comment.trim(),
        precision,
        report.energy
    )?;
    for (atom, &charge) in report.atoms.iter().zip(report.charges.iter()) {
        writeln!(
            writer,
            "{} {:.*} {:.*} {:.*} {:.*}",
            label(atom),
            precision,
            atom.position[0],
            precision,
            atom.position[1],
            precision,
            atom.position[2],
            precision,
            charge
        )?;
    }
    Ok(())
}

fn write_csv(
    writer: &mut dyn Write,
    report: &ChargeReport<'_>,
    precision: usize,
) -> Result<(), CliError> {
    writeln!(writer, "index,element,x,y,z,charge,energy")?;
    for (i, atom) in report.atoms.iter().enumerate() {
        writeln!(
            writer,
            "{},{},{:.*},{:.*},{:.*},{:.*},{:.*}",
            i,
            label(atom),
            precision,
            atom.position[0],
            precision,
            atom.position[1],
            precision,
            atom.position[2],
            precision,
            report.charges[i],
            precision,
            report.energies[i]
        )?;
    }
    Ok(())
}

fn write_json(
    writer: &mut dyn Write,
    report: &ChargeReport<'_>,
    precision: usize,
) -> Result<(), CliError> {
    let n = report.atoms.len();
    writeln!(writer, "{{")?;
    writeln!(writer, "  \"atoms\": [")?;
    for (i, atom) in report.atoms.iter().enumerate() {
        let symbol = atomic_number_to_symbol(atom.atomic_number).unwrap_or("??");
        let comma = if i + 1 < n { "," } else { "" };
        writeln!(writer, "    {{")?;
        writeln!(writer, "      \"index\": {},", i)?;
        writeln!(writer, "      \"element\": \"{}\",", symbol)?;
        writeln!(writer, "      \"ghost\": {},", atom.ghost)?;
        writeln!(
            writer,
            "      \"position\": [{:.*}, {:.*}, {:.*}],",
            precision, atom.position[0], precision, atom.position[1], precision, atom.position[2]
        )?;
        writeln!(writer, "      \"charge\": {:.*},", precision, report.charges[i])?;
        writeln!(writer, "      \"energy\": {:.*}", precision, report.energies[i])?;
        writeln!(writer, "    }}{}", comma)?;
    }
    writeln!(writer, "  ],")?;
    writeln!(
        writer,
        "  \"total_charge\": {:.*},",
        precision,
        report.charges.iter().sum::<f64>()
    )?;
    writeln!(writer, "  \"dtype\": \"{}\",", report.dtype)?;
    writeln!(writer, "  \"energy\": {:.*}", precision, report.energy)?;
    writeln!(writer, "}}")?;
    Ok(())
}
