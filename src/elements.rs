//! Element symbols and atomic numbers.

/// Standard element symbols, indexed by `atomic_number - 1`.
pub const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Converts a case-sensitive element symbol ("Fe", not "FE") to its atomic number.
pub fn symbol_to_atomic_number(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .map(|index| index as u8 + 1)
}

/// Returns the symbol of an element, or `None` outside 1..=118.
pub fn atomic_number_to_symbol(atomic_number: u8) -> Option<&'static str> {
    SYMBOLS.get(usize::from(atomic_number).checked_sub(1)?).copied()
}

/// Lenient parsing as found in structure files: an atomic number, or a symbol
/// in any letter case.
pub fn parse_element(token: &str) -> Option<u8> {
    if let Ok(number) = token.parse::<u8>() {
        return (1..=118).contains(&number).then_some(number);
    }
    SYMBOLS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(token))
        .map(|index| index as u8 + 1)
}
