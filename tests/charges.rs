mod common;

use approx::assert_abs_diff_eq;
use common::{Molecule, ammonium, batch, formamide, methane, molecule_sum, single, water};
use eeq::{Device, Dtype, EeqError, EeqModel, Parameters, SolverOptions, Tensor};
use std::io::Write;
use tempfile::NamedTempFile;

fn solve_charges(model: &EeqModel, molecule: &Molecule, total_charge: f64) -> Vec<f64> {
    let inputs = single(molecule, total_charge, model.dtype());
    model
        .charges(
            &inputs.numbers,
            &inputs.positions,
            &inputs.total_charge,
            &inputs.mask,
        )
        .expect("solve failed")
        .to_vec_f64()
}

#[test]
fn test_single_molecule_charges_sum_to_zero() {
    let model = EeqModel::param2019();
    let molecule = methane();
    let charges = solve_charges(&model, &molecule, 0.0);

    assert_eq!(charges.len(), 5);
    assert_abs_diff_eq!(charges.iter().sum::<f64>(), 0.0, epsilon = 1e-8);
    assert!(charges[0] < 0.0, "carbon should carry a negative charge");
    for h in 2..5 {
        assert_abs_diff_eq!(charges[1], charges[h], epsilon = 1e-10);
    }
}

#[test]
fn test_charged_molecules_sum_to_their_total_charge() {
    let model = EeqModel::param2019();
    for (molecule, total_charge) in [(ammonium(), 1.0), (water(), -1.0), (formamide(), 0.0)] {
        let charges = solve_charges(&model, &molecule, total_charge);
        assert_abs_diff_eq!(charges.iter().sum::<f64>(), total_charge, epsilon = 1e-8);
        assert!(
            charges.iter().all(|q| q.is_finite()),
            "{} produced non-finite charges",
            molecule.name
        );
    }
}

#[test]
fn test_electronegative_atoms_are_negative() {
    let model = EeqModel::param2019();
    let charges = solve_charges(&model, &formamide(), 0.0);
    assert!(charges[1] < 0.0, "oxygen should be negative");
    assert!(charges[2] < 0.0, "nitrogen should be negative");
    assert!(charges[3..].iter().all(|&q| q > 0.0), "hydrogens should be positive");
}

#[test]
fn test_batch_with_padding() {
    let model = EeqModel::param2019();
    let (small, large) = (water(), methane());
    let inputs = batch(&[&small, &large], &[0.0, 1.0], Dtype::Float64);
    let solution = model
        .solve(
            &inputs.numbers,
            &inputs.positions,
            &inputs.total_charge,
            &inputs.mask,
        )
        .unwrap();

    assert_eq!(solution.charges.shape(), &[2, 5]);
    assert_eq!(solution.energy.shape(), &[2]);
    let charges = solution.charges.to_vec_f64();
    let energies = solution.energies.to_vec_f64();

    for padded in [3, 4] {
        assert_eq!(charges[padded], 0.0);
        assert_eq!(energies[padded], 0.0);
    }
    assert_abs_diff_eq!(molecule_sum(&charges, 0, 5), 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(molecule_sum(&charges, 1, 5), 1.0, epsilon = 1e-8);

    let energy = solution.energy.to_vec_f64();
    for m in 0..2 {
        assert_abs_diff_eq!(energy[m], molecule_sum(&energies, m, 5), epsilon = 1e-12);
    }
}

#[test]
fn test_padding_does_not_change_charges() {
    let model = EeqModel::param2019();
    let alone = solve_charges(&model, &water(), 0.0);

    let inputs = batch(&[&water(), &formamide()], &[0.0, 0.0], Dtype::Float64);
    let batched = model
        .charges(
            &inputs.numbers,
            &inputs.positions,
            &inputs.total_charge,
            &inputs.mask,
        )
        .unwrap()
        .to_vec_f64();

    for (a, b) in alone.iter().zip(&batched[..3]) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }
}

#[test]
fn test_ghost_atoms_carry_no_charge_but_count_as_neighbours() {
    let model = EeqModel::param2019();
    let molecule = methane();
    let inputs = single(&molecule, 0.0, Dtype::Float64);
    let mask = Tensor::from_bool(&[5], vec![true, true, true, true, false]).unwrap();

    let solution = model
        .solve(&inputs.numbers, &inputs.positions, &inputs.total_charge, &mask)
        .unwrap();
    let with_ghost = solution.charges.to_vec_f64();
    assert_eq!(with_ghost[4], 0.0);
    assert_eq!(solution.energies.to_vec_f64()[4], 0.0);
    assert_abs_diff_eq!(with_ghost.iter().sum::<f64>(), 0.0, epsilon = 1e-8);

    let removed = Molecule {
        name: "methyl",
        numbers: molecule.numbers[..4].to_vec(),
        positions: molecule.positions[..4].to_vec(),
    };
    let without_atom = solve_charges(&model, &removed, 0.0);
    assert!(
        (with_ghost[0] - without_atom[0]).abs() > 1e-6,
        "the ghost should change the carbon coordination number"
    );

    let blind = model.clone().with_options(SolverOptions {
        ghosts_in_cn: false,
        ..Default::default()
    });
    let ignored = blind
        .charges(&inputs.numbers, &inputs.positions, &inputs.total_charge, &mask)
        .unwrap()
        .to_vec_f64();
    for (a, b) in ignored[..4].iter().zip(&without_atom) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }
}

#[test]
fn test_reduced_precision_solves() {
    let reference = solve_charges(&EeqModel::param2019(), &formamide(), 0.0);

    let single_model = EeqModel::param2019().to_dtype(Dtype::Float32).unwrap();
    let inputs = single(&formamide(), 0.0, Dtype::Float32);
    let charges = single_model
        .charges(
            &inputs.numbers,
            &inputs.positions,
            &inputs.total_charge,
            &inputs.mask,
        )
        .unwrap();
    assert_eq!(charges.dtype(), Dtype::Float32);
    for (a, b) in charges.to_vec_f64().iter().zip(&reference) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }

    let half_model = EeqModel::param2019_with(Dtype::Float16, Device::Cpu).unwrap();
    let half = solve_charges(&half_model, &formamide(), 0.0);
    assert_abs_diff_eq!(half.iter().sum::<f64>(), 0.0, epsilon = 5e-3);
    for (a, b) in half.iter().zip(&reference) {
        assert_eq!(a.signum(), b.signum());
    }
}

#[test]
fn test_all_padding_molecule_in_batch() {
    let model = EeqModel::param2019();
    let empty = Molecule {
        name: "empty",
        numbers: vec![0, 0],
        positions: vec![[0.0; 3]; 2],
    };
    let inputs = batch(&[&empty, &water()], &[0.0, 0.0], Dtype::Float64);
    let charges = model
        .charges(
            &inputs.numbers,
            &inputs.positions,
            &inputs.total_charge,
            &inputs.mask,
        )
        .unwrap()
        .to_vec_f64();
    assert_eq!(&charges[..3], &[0.0, 0.0, 0.0]);
    assert_abs_diff_eq!(molecule_sum(&charges, 1, 3), 0.0, epsilon = 1e-8);
}

#[test]
fn test_charged_molecule_without_real_atoms_is_rejected() {
    let model = EeqModel::param2019();
    let ghosts = Molecule {
        name: "ghost hydrogen",
        numbers: vec![1, 1],
        positions: vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.4]],
    };
    let mut inputs = single(&ghosts, 1.0, Dtype::Float64);
    inputs.mask = Tensor::from_i64(&[2], vec![0, 0]).unwrap();
    let result = model.solve(
        &inputs.numbers,
        &inputs.positions,
        &inputs.total_charge,
        &inputs.mask,
    );
    assert!(matches!(result, Err(EeqError::NoChargeCarriers(q)) if q == 1.0));

    let empty = Molecule {
        name: "empty",
        numbers: vec![0, 0],
        positions: vec![[0.0; 3]; 2],
    };
    let inputs = batch(&[&water(), &empty], &[0.0, -1.0], Dtype::Float64);
    let result = model.energy_gradient(
        &inputs.numbers,
        &inputs.positions,
        &inputs.total_charge,
        &inputs.mask,
    );
    assert!(matches!(result, Err(EeqError::NoChargeCarriers(q)) if q == -1.0));
}

#[test]
fn test_custom_parameter_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[elements]\nH = {{ chi = 1.2, eta = -0.3, kcn = 0.05, rad = 0.55 }}\n"
    )
    .unwrap();
    let params = Parameters::load_from_file(file.path()).unwrap();
    let model = EeqModel::from_parameters(&params, Dtype::Float64, Device::Cpu).unwrap();

    let hydrogen = Molecule {
        name: "hydrogen",
        numbers: vec![1, 1],
        positions: vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.4]],
    };
    let charges = solve_charges(&model, &hydrogen, 0.0);
    assert_abs_diff_eq!(charges[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(charges[1], 0.0, epsilon = 1e-12);

    let inputs = single(&water(), 0.0, Dtype::Float64);
    let result = model.solve(
        &inputs.numbers,
        &inputs.positions,
        &inputs.total_charge,
        &inputs.mask,
    );
    assert!(matches!(result, Err(EeqError::ParameterNotFound(8))));
}
