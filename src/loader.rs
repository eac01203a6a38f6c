//! Read MDL molfiles (V2000) and SD files into [`MolecularGraph`]s.
//!
//! Atoms keep the charge and stereo parity found in the file; explicit
//! hydrogens stay explicit. Hybridization and implicit hydrogen counts are
//! inferred from the bond orders around each atom and the element's default
//! valences.

use std::{fs, io, ops::Range, path::Path};

use thiserror::Error;

use crate::molecule::{Atom, Bond, BondOrder, Chirality, Element, Hybridization, MolecularGraph};

const COUNTS_LINE: usize = 3;

const ATOM_SYMBOL: Range<usize> = 31..34;
const ATOM_CHARGE: Range<usize> = 36..39;
const ATOM_PARITY: Range<usize> = 39..42;
const ATOM_VALENCE: Range<usize> = 48..51;

const BOND_FIRST: Range<usize> = 0..3;
const BOND_SECOND: Range<usize> = 3..6;
const BOND_TYPE: Range<usize> = 6..9;

/// Errors raised while reading a molfile.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read molfile")]
    Io(#[from] io::Error),

    #[error("record {record}: {detail}")]
    Malformed { record: usize, detail: String },

    #[error("record {record}, atom {atom}: unknown element symbol '{symbol}'")]
    UnknownElement {
        record: usize,
        atom: usize,
        symbol: String,
    },
}

/// Read every record of the molfile or SD file at `path`.
pub fn parse(path: &Path) -> Result<Vec<MolecularGraph>, ParseError> {
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Parse every `$$$$`-separated record of `contents`.
pub fn parse_str(contents: &str) -> Result<Vec<MolecularGraph>, ParseError> {
    let mut records = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in contents.lines() {
        if line.trim_end() == "$$$$" {
            if current.iter().any(|l| !l.trim().is_empty()) {
                records.push(parse_record(&current, records.len())?);
            }
            current.clear();
        } else {
            current.push(line);
        }
    }
    if current.iter().any(|l| !l.trim().is_empty()) {
        records.push(parse_record(&current, records.len())?);
    }

    tracing::debug!(records = records.len(), "parsed molfile");
    Ok(records)
}

/// Parse a single molfile block.
pub fn parse_mol_block(block: &str) -> Result<MolecularGraph, ParseError> {
    let lines: Vec<&str> = block.lines().collect();
    parse_record(&lines, 0)
}

fn parse_record(lines: &[&str], record: usize) -> Result<MolecularGraph, ParseError> {
    let malformed = |detail: String| ParseError::Malformed { record, detail };

    let counts = lines
        .get(COUNTS_LINE)
        .ok_or_else(|| malformed("missing counts line".into()))?;
    if counts.contains("V3000") {
        return Err(malformed("V3000 molfiles are not supported".into()));
    }
    let num_atoms: usize = int_column(counts, 0..3)
        .ok_or_else(|| malformed(format!("bad atom count in '{counts}'")))?;
    let num_bonds: usize = int_column(counts, 3..6)
        .ok_or_else(|| malformed(format!("bad bond count in '{counts}'")))?;

    let atom_start = COUNTS_LINE + 1;
    let bond_start = atom_start + num_atoms;
    let props_start = bond_start + num_bonds;
    if lines.len() < props_start {
        return Err(malformed(format!(
            "expected {num_atoms} atoms and {num_bonds} bonds, record has {} lines",
            lines.len()
        )));
    }

    let mut atoms = Vec::with_capacity(num_atoms);
    let mut valences = Vec::with_capacity(num_atoms);
    for (i, line) in lines[atom_start..bond_start].iter().enumerate() {
        let symbol = column(line, ATOM_SYMBOL);
        let element = match symbol {
            "D" | "T" => Element::Hydrogen,
            s => s.parse().map_err(|_| ParseError::UnknownElement {
                record,
                atom: i + 1,
                symbol: s.to_string(),
            })?,
        };
        let charge = match int_column::<u8>(line, ATOM_CHARGE).unwrap_or(0) {
            1 => 3,
            2 => 2,
            3 => 1,
            5 => -1,
            6 => -2,
            7 => -3,
            _ => 0,
        };
        let chirality = match int_column::<u8>(line, ATOM_PARITY).unwrap_or(0) {
            1 => Chirality::Clockwise,
            2 => Chirality::CounterClockwise,
            _ => Chirality::None,
        };
        atoms.push(Atom::new(element).with_charge(charge).with_chirality(chirality));
        valences.push(int_column::<u8>(line, ATOM_VALENCE).unwrap_or(0));
    }

    let mut bonds = Vec::with_capacity(num_bonds);
    for line in &lines[bond_start..props_start] {
        let first: usize = int_column(line, BOND_FIRST).unwrap_or(0);
        let second: usize = int_column(line, BOND_SECOND).unwrap_or(0);
        if first == 0 || second == 0 {
            return Err(malformed(format!("bad atom reference in bond '{line}'")));
        }
        let code: i64 = int_column(line, BOND_TYPE).unwrap_or(0);
        let order = BondOrder::try_from(code).map_err(|e| malformed(e.to_string()))?;
        bonds.push(Bond::new(first - 1, second - 1, order));
    }

    // A property block charge line resets every charge given in the atom block.
    let mut charges_reset = false;
    for line in &lines[props_start..] {
        if line.starts_with("M  END") {
            break;
        }
        if !line.starts_with("M  CHG") {
            continue;
        }
        if !charges_reset {
            for atom in atoms.iter_mut() {
                *atom = atom.with_charge(0);
            }
            charges_reset = true;
        }
        let entries: Vec<i64> = line[6..]
            .split_whitespace()
            .map(|t| t.parse())
            .collect::<Result<_, _>>()
            .map_err(|_| malformed(format!("bad charge line '{line}'")))?;
        for pair in entries.get(1..).unwrap_or_default().chunks_exact(2) {
            let atom = usize::try_from(pair[0] - 1)
                .ok()
                .and_then(|ix| atoms.get_mut(ix))
                .ok_or_else(|| malformed(format!("charge on missing atom {}", pair[0])))?;
            let charge = i8::try_from(pair[1])
                .map_err(|_| malformed(format!("charge {} out of range", pair[1])))?;
            *atom = atom.with_charge(charge);
        }
    }

    perceive_hydrogens(&mut atoms, &bonds, &valences);
    Ok(MolecularGraph::from_parts(atoms, bonds))
}

/// Fill in hybridization and implicit hydrogens from the bonds of each atom.
fn perceive_hydrogens(atoms: &mut [Atom], bonds: &[Bond], valences: &[u8]) {
    // Bond order sums are kept in half units so aromatic bonds count 1.5.
    let mut half_orders = vec![0usize; atoms.len()];
    let mut multiple = vec![(0usize, 0usize, false); atoms.len()];
    for bond in bonds {
        let (i, j) = bond.atoms();
        let (half, double, triple, aromatic) = match bond.order() {
            BondOrder::Single => (2, 0, 0, false),
            BondOrder::Double => (4, 1, 0, false),
            BondOrder::Triple => (6, 0, 1, false),
            BondOrder::Aromatic => (3, 0, 0, true),
        };
        for ix in [i, j] {
            if let (Some(h), Some(m)) = (half_orders.get_mut(ix), multiple.get_mut(ix)) {
                *h += half;
                m.0 += double;
                m.1 += triple;
                m.2 |= aromatic;
            }
        }
    }

    for (ix, atom) in atoms.iter_mut().enumerate() {
        if atom.element().is_hydrogen() {
            continue;
        }
        let used = half_orders[ix] / 2;
        let hydrogens = match valences[ix] {
            0 => default_valences(atom.element(), atom.charge())
                .and_then(|vs| vs.into_iter().find(|&v| v >= used))
                .map_or(0, |v| v - used),
            15 => 0,
            v => (v as usize).saturating_sub(used),
        };

        let (doubles, triples, aromatic) = multiple[ix];
        let known = default_valences(atom.element(), 0).is_some();
        let hybridization = if aromatic {
            Hybridization::Aromatic
        } else if triples > 0 || doubles > 1 {
            Hybridization::Sp
        } else if doubles == 1 {
            Hybridization::Sp2
        } else if known {
            Hybridization::Sp3
        } else {
            Hybridization::Unspecified
        };

        *atom = atom
            .with_hydrogens(u8::try_from(hydrogens).unwrap_or(u8::MAX))
            .with_hybridization(hybridization);
    }
}

/// Allowed valences of common organic elements, adjusted for formal charge.
fn default_valences(element: Element, charge: i8) -> Option<Vec<usize>> {
    let (base, group): (&[i64], i64) = match element {
        Element::Boron => (&[3], 13),
        Element::Carbon => (&[4], 14),
        Element::Nitrogen => (&[3], 15),
        Element::Phosphorus => (&[3, 5], 15),
        Element::Oxygen => (&[2], 16),
        Element::Sulfur => (&[2, 4, 6], 16),
        Element::Selenium => (&[2, 4, 6], 16),
        Element::Fluorine => (&[1], 17),
        Element::Chlorine | Element::Bromine | Element::Iodine => (&[1], 17),
        _ => return None,
    };
    let charge = i64::from(charge);
    Some(
        base.iter()
            .map(|&v| match group {
                13 => v - charge,
                14 => v - charge.abs(),
                _ => v + charge,
            })
            .filter_map(|v| usize::try_from(v).ok())
            .collect(),
    )
}

fn column(line: &str, range: Range<usize>) -> &str {
    let end = range.end.min(line.len());
    line.get(range.start.min(end)..end).unwrap_or_default().trim()
}

fn int_column<T: std::str::FromStr>(line: &str, range: Range<usize>) -> Option<T> {
    column(line, range).parse().ok()
}
