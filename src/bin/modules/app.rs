use super::cli::Cli;
use super::error::CliError;
use super::io::{self, ChargeReport};
use eeq::math::constants::ANGSTROM_TO_BOHR;
use eeq::{
    Atom, AtomView, Device, EeqError, EeqModel, Parameters, Tensor, get_default_parameters,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub fn run(args: Cli) -> Result<(), CliError> {
    let dtype = args.calculation.dtype;
    let model = match &args.calculation.params {
        Some(params_path) => {
            info!("loading parameters from {}", params_path.display());
            let params = Parameters::load_from_file(params_path)?;
            EeqModel::from_parameters(&params, dtype, Device::Cpu)?
        }
        None => EeqModel::from_parameters(get_default_parameters(), dtype, Device::Cpu)?,
    };
    let model = model.with_options(args.solver.to_library());

    let (atoms, comment) = io::read_atoms(&args.input)?;
    if atoms.is_empty() {
        return Err(EeqError::NoAtoms.into());
    }

    let source_name = if args.input == "-" {
        "stdin".to_string()
    } else {
        args.input.clone()
    };
    info!("read {} atoms from {}", atoms.len(), source_name);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Calculating partial charges...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let (numbers, positions, total_charge, mask) =
        to_tensors(&atoms, args.calculation.total_charge, &model)?;
    let solution = model.solve(&numbers, &positions, &total_charge, &mask)?;

    pb.finish_and_clear();

    let report = ChargeReport {
        atoms: &atoms,
        charges: solution.charges.to_vec_f64(),
        energies: solution.energies.to_vec_f64(),
        energy: solution.energy.to_vec_f64().iter().sum(),
        dtype,
    };

    let writer = io::get_writer(&args.output.output)?;
    io::write_results(
        writer,
        &report,
        &comment,
        &args.output.format,
        args.output.precision,
        &source_name,
    )?;

    Ok(())
}

/// Converts angstrom atoms into the tensors of a single-molecule solve.
fn to_tensors(
    atoms: &[Atom],
    total_charge: f64,
    model: &EeqModel,
) -> Result<(Tensor, Tensor, Tensor, Tensor), CliError> {
    let n = atoms.len();
    let dtype = model.dtype();
    let numbers = Tensor::from_i64(
        &[n],
        atoms.iter().map(|a| i64::from(a.atomic_number())).collect(),
    )?;
    let positions = Tensor::from_f64(
        &[n, 3],
        atoms
            .iter()
            .flat_map(|a| a.position().map(|x| x * ANGSTROM_TO_BOHR))
            .collect(),
        dtype,
    )?;
    let mask = Tensor::from_i64(
        &[n],
        atoms.iter().map(|a| i64::from(!a.is_ghost())).collect(),
    )?;
    let total_charge = Tensor::scalar(total_charge, dtype)?;
    Ok((numbers, positions, total_charge, mask))
}
