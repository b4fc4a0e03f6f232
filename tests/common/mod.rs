#![allow(dead_code)]

use eeq::{Dtype, EeqModel, Tensor};

/// A test molecule with positions in Bohr.
pub struct Molecule<'a> {
    pub name: &'a str,
    pub numbers: Vec<i64>,
    pub positions: Vec<[f64; 3]>,
}

impl Molecule<'_> {
    pub fn len(&self) -> usize {
        self.numbers.len()
    }
}

/// Inputs of one `solve` call.
pub struct Inputs {
    pub numbers: Tensor,
    pub positions: Tensor,
    pub total_charge: Tensor,
    pub mask: Tensor,
}

pub fn methane() -> Molecule<'static> {
    Molecule {
        name: "methane",
        numbers: vec![6, 1, 1, 1, 1],
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.1888, 1.1888, 1.1888],
            [-1.1888, -1.1888, 1.1888],
            [-1.1888, 1.1888, -1.1888],
            [1.1888, -1.1888, -1.1888],
        ],
    }
}

pub fn water() -> Molecule<'static> {
    Molecule {
        name: "water",
        numbers: vec![8, 1, 1],
        positions: vec![
            [0.0, 0.0, 0.2249],
            [0.0, 1.4419, -0.9014],
            [0.0, -1.4419, -0.9014],
        ],
    }
}

pub fn ammonium() -> Molecule<'static> {
    Molecule {
        name: "ammonium",
        numbers: vec![7, 1, 1, 1, 1],
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.1198, 1.1198, 1.1198],
            [-1.1198, -1.1198, 1.1198],
            [-1.1198, 1.1198, -1.1198],
            [1.1198, -1.1198, -1.1198],
        ],
    }
}

pub fn formamide() -> Molecule<'static> {
    Molecule {
        name: "formamide",
        numbers: vec![6, 8, 7, 1, 1, 1],
        positions: vec![
            [0.0000, 0.7855, 0.0],
            [2.2385, 1.3050, 0.0],
            [-1.7825, 2.5535, 0.0],
            [-0.6225, -1.2048, 0.0],
            [-1.3420, 4.4090, 0.0],
            [-3.6635, 2.0755, 0.0],
        ],
    }
}

/// Single-molecule inputs with a 0-d total charge and every atom real.
pub fn single(molecule: &Molecule, total_charge: f64, dtype: Dtype) -> Inputs {
    let n = molecule.len();
    let numbers = Tensor::from_i64(&[n], molecule.numbers.clone()).unwrap();
    Inputs {
        positions: Tensor::from_f64(&[n, 3], molecule.positions.concat(), dtype).unwrap(),
        total_charge: Tensor::scalar(total_charge, dtype).unwrap(),
        mask: numbers.ones_like(),
        numbers,
    }
}

/// Batched inputs padded with atomic number 0 to the largest molecule.
pub fn batch(molecules: &[&Molecule], total_charges: &[f64], dtype: Dtype) -> Inputs {
    let b = molecules.len();
    let n = molecules.iter().map(|m| m.len()).max().unwrap_or(0);

    let mut numbers = vec![0; b * n];
    let mut positions = vec![0.0; b * n * 3];
    for (m, molecule) in molecules.iter().enumerate() {
        for (a, (&z, p)) in molecule.numbers.iter().zip(&molecule.positions).enumerate() {
            let slot = m * n + a;
            numbers[slot] = z;
            positions[3 * slot..3 * slot + 3].copy_from_slice(p);
        }
    }

    let numbers = Tensor::from_i64(&[b, n], numbers).unwrap();
    Inputs {
        positions: Tensor::from_f64(&[b, n, 3], positions, dtype).unwrap(),
        total_charge: Tensor::from_f64(&[b, 1], total_charges.to_vec(), dtype).unwrap(),
        mask: numbers.ones_like(),
        numbers,
    }
}

/// Sum of `values` over the slots `m * n .. (m + 1) * n`.
pub fn molecule_sum(values: &[f64], m: usize, n: usize) -> f64 {
    values[m * n..(m + 1) * n].iter().sum()
}

/// A molecule with reference charges `(atom index, charge)` for a given total charge.
pub struct TestCase<'a> {
    pub molecule: Molecule<'a>,
    pub total_charge: f64,
    pub expected: Vec<(usize, f64)>,
}

/// Error statistics of one group of reference comparisons.
#[derive(Default)]
struct GroupStats {
    total_error: f64,
    max_error: f64,
    data_points: usize,
}

impl GroupStats {
    fn record(&mut self, name: &str, index: usize, expected_q: f64, calculated_q: f64) {
        let error = (calculated_q - expected_q).abs();
        println!(
            "{:<20} | {:<10} | {:<10.5} | {:<10.5} (Err: {:.2e})",
            name, index, expected_q, calculated_q, error
        );
        self.total_error += error;
        if error > self.max_error {
            self.max_error = error;
        }
        self.data_points += 1;
    }

    fn check(&self, group_name: &str, avg_limit: f64, max_limit: f64) {
        let avg_error = if self.data_points > 0 {
            self.total_error / self.data_points as f64
        } else {
            0.0
        };

        println!("{:-<80}", "");
        println!("Group Statistics for '{}':", group_name);
        println!("  Total Data Points: {}", self.data_points);
        println!(
            "  Group Avg Error:   {:.2e} (Limit: {:.2e})",
            avg_error, avg_limit
        );
        println!(
            "  Group Max Error:   {:.2e} (Limit: {:.2e})",
            self.max_error, max_limit
        );
        println!("{:-<80}\n", "");

        assert!(self.data_points > 0, "Group '{}' has no reference values", group_name);
        assert!(
            avg_error <= avg_limit,
            "Group average error {:.2e} exceeds limit {:.2e}",
            avg_error,
            avg_limit
        );
        assert!(
            self.max_error <= max_limit,
            "Group maximum error {:.2e} exceeds limit {:.2e}",
            self.max_error,
            max_limit
        );
    }
}

fn print_header(group_name: &str) {
    println!("\nRunning Group Test: {}", group_name);
    println!("{:-<80}", "");
    println!(
        "{:<20} | {:<10} | {:<10} | {:<10}",
        "Molecule", "Atom Idx", "Expected", "Calculated"
    );
}

/// Solves every case on its own and compares against the reference charges.
pub fn run_group_test(group_name: &str, cases: &[TestCase], avg_limit: f64, max_limit: f64) {
    let model = EeqModel::param2019();
    let mut stats = GroupStats::default();
    print_header(group_name);

    for case in cases {
        let inputs = single(&case.molecule, case.total_charge, Dtype::Float64);
        let charges = model
            .charges(
                &inputs.numbers,
                &inputs.positions,
                &inputs.total_charge,
                &inputs.mask,
            )
            .expect("Solver failed")
            .to_vec_f64();

        for &(index, expected_q) in &case.expected {
            stats.record(case.molecule.name, index, expected_q, charges[index]);
        }
    }

    stats.check(group_name, avg_limit, max_limit);
}

/// Solves all cases in one padded batch and compares against the reference charges.
pub fn run_batched_group_test(
    group_name: &str,
    cases: &[TestCase],
    avg_limit: f64,
    max_limit: f64,
) {
    let model = EeqModel::param2019();
    let mut stats = GroupStats::default();
    print_header(group_name);

    let molecules: Vec<&Molecule> = cases.iter().map(|c| &c.molecule).collect();
    let total_charges: Vec<f64> = cases.iter().map(|c| c.total_charge).collect();
    let inputs = batch(&molecules, &total_charges, Dtype::Float64);
    let n = inputs.numbers.shape()[1];
    let charges = model
        .charges(
            &inputs.numbers,
            &inputs.positions,
            &inputs.total_charge,
            &inputs.mask,
        )
        .expect("Solver failed")
        .to_vec_f64();

    for (m, case) in cases.iter().enumerate() {
        for &(index, expected_q) in &case.expected {
            stats.record(case.molecule.name, index, expected_q, charges[m * n + index]);
        }
        for padded in case.molecule.len()..n {
            assert_eq!(charges[m * n + padded], 0.0, "padding slot carries charge");
        }
    }

    stats.check(group_name, avg_limit, max_limit);
}
