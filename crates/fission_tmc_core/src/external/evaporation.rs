//! Evaporation stage: fragment-library files, input deck and report parsing
//!
//! The evaporation code picks up the trial's yields from its fission-fragment
//! library by the `geffissionfileid` keyword. It interpolates in incident
//! energy, so the same table is written under two adjacent integer energy
//! labels.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CampaignError, ExternalToolError};
use crate::external::{
    Invocation, Separator, StdinSource, ensure_dir, numeric_rows, remove_dir_if_exists, token_at,
    write_file,
};
use crate::format::{float_literal, scientific};
use crate::model::{Reaction, Report, TrialId, YieldTable, columns};

/// Energy labels (MeV) the library file is written under
pub const LIBRARY_ENERGIES: [u32; 2] = [6, 7];

const LIBRARY_EXTENSION: &str = "ff";
const COLUMN_LEGEND: &str = "Zl  Al   Zh  Ah   Yield       TKE[MeV]    TXE[MeV]    \
                             El[MeV]     Wl[MeV]     Eh[MeV]     Wh[MeV]";

/// Fragment library directory for the compound nucleus under the
/// evaporation code's installation root
pub fn library_dir(install_root: &Path, reaction: &Reaction) -> Result<PathBuf, CampaignError> {
    let symbol = reaction.symbol()?;
    Ok(install_root
        .join("structure")
        .join("fission")
        .join("ff")
        .join("gef")
        .join(format!("{symbol}{}", reaction.a_compound)))
}

/// `U236_6.00e+00MeV_gef_tmc_5.ff`
pub fn library_file_name(
    reaction: &Reaction,
    energy: u32,
    trial: &TrialId,
) -> Result<String, CampaignError> {
    let symbol = reaction.symbol()?;
    Ok(format!(
        "{symbol}{}_{energy}.00e+00MeV_gef_{}.{LIBRARY_EXTENSION}",
        reaction.a_compound,
        trial.as_str().to_lowercase()
    ))
}

/// Render the yield table in the library's text format. Only the basic
/// eleven columns are written; zero-filled rows are skipped.
#[must_use]
pub fn render_library(reaction: &Reaction, table: &YieldTable) -> String {
    let mut out = format!(
        "# Z        =   {:>3}\n# A        =   {:>3}\n# Ex (MeV) =   {:>3}\n\
         # Ntotal   =   {:>3}\n# {COLUMN_LEGEND}\n",
        reaction.z_target,
        reaction.a_compound,
        scientific(reaction.energy_mev, 2),
        table.len(),
    );
    for row in table.rows() {
        out.push_str(&format!(
            "{:>4.0} {:>3.0} {:>4.0} {:>4.0}",
            row[columns::Z_LIGHT],
            row[columns::A_LIGHT],
            row[columns::Z_HEAVY],
            row[columns::A_HEAVY],
        ));
        for value in &row[columns::YIELD..=columns::EXC_HEAVY_STD] {
            out.push_str("  ");
            out.push_str(&scientific(f64::from(*value), 4));
        }
        out.push('\n');
    }
    out
}

/// Write the table under every label in [`LIBRARY_ENERGIES`]
pub fn write_library_files(
    library: &Path,
    reaction: &Reaction,
    trial: &TrialId,
    table: &YieldTable,
) -> Result<Vec<PathBuf>, CampaignError> {
    ensure_dir(library)?;
    let contents = render_library(reaction, table);
    let mut written = Vec::with_capacity(LIBRARY_ENERGIES.len());
    for energy in LIBRARY_ENERGIES {
        let path = library.join(library_file_name(reaction, energy, trial)?);
        write_file(&path, &contents)?;
        written.push(path);
    }
    Ok(written)
}

/// Remove every library file produced for `trial`
pub fn remove_library_files(library: &Path, trial: &TrialId) -> Result<usize, ExternalToolError> {
    let suffix = format!("_gef_{}.{LIBRARY_EXTENSION}", trial.as_str().to_lowercase());
    let entries = match fs::read_dir(library) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(ExternalToolError::io(library, e)),
    };
    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| ExternalToolError::io(library, e))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix));
        if matches && path.is_file() {
            fs::remove_file(&path).map_err(|e| ExternalToolError::io(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Trial working directory under `root`
#[must_use]
pub fn work_dir(root: &Path, trial: &TrialId) -> PathBuf {
    root.join(format!("TALYS_folder_{trial}"))
}

/// Input deck path inside the working directory
#[must_use]
pub fn deck_file(dir: &Path, trial: &TrialId) -> PathBuf {
    dir.join(format!("{trial}_input.in"))
}

/// Write the input deck; the trial id selects the perturbed library file
pub fn write_deck(
    dir: &Path,
    reaction: &Reaction,
    trial: &TrialId,
) -> Result<PathBuf, CampaignError> {
    ensure_dir(dir)?;
    let symbol = reaction.symbol()?;
    let keywords: [(&str, String); 18] = [
        ("projectile", "n".into()),
        ("element", symbol.into()),
        ("mass", reaction.a_target().to_string()),
        ("energy", float_literal(reaction.energy_mev)),
        ("fission", "y".into()),
        ("ejectiles", "g n".into()),
        ("massdis", "y".into()),
        ("fymodel", "4".into()),
        ("ffmodel", "1".into()),
        ("elow", "0.000001".into()),
        ("Rfiseps", "0.000000001".into()),
        ("outspectra", "y".into()),
        ("bins", "100".into()),
        ("channels", "n".into()),
        ("maxchannel", "8".into()),
        ("Rspincutff", "4".into()),
        ("Rspincut", "0.4".into()),
        ("geffissionfileid", trial.to_string()),
    ];
    let deck = keywords
        .iter()
        .map(|(key, value)| format!("{key} {value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let path = deck_file(dir, trial);
    write_file(&path, &deck)?;
    Ok(path)
}

/// Run description: deck on stdin, listing to `{trial}_output.out`
#[must_use]
pub fn invocation(dir: &Path, trial: &TrialId) -> Invocation {
    Invocation {
        working_dir: dir.to_path_buf(),
        stdin: StdinSource::File(deck_file(dir, trial)),
        stdout: Some(dir.join(format!("{trial}_output.out"))),
    }
}

/// A scalar read from the first file whose name starts with `prefix`
struct PrefixField {
    name: &'static str,
    prefix: &'static str,
    line: usize,
    token: usize,
}

const REPORT_FIELDS: &[PrefixField] = &[
    PrefixField {
        name: "mean_prompt_gamma_energy",
        prefix: "pfgs",
        line: 3,
        token: 3,
    },
    PrefixField {
        name: "mean_prompt_neutron_energy",
        prefix: "pfns",
        line: 3,
        token: 3,
    },
    PrefixField {
        name: "prompt_gamma_multiplicity",
        prefix: "Pnug",
        line: 2,
        token: 5,
    },
    PrefixField {
        name: "prompt_neutron_multiplicity",
        prefix: "Pnun",
        line: 2,
        token: 5,
    },
    PrefixField {
        name: "mean_gamma_multiplicity_over_a",
        prefix: "nugA",
        line: 2,
        token: 5,
    },
    PrefixField {
        name: "mean_neutron_multiplicity_over_a",
        prefix: "nunA",
        line: 2,
        token: 5,
    },
    PrefixField {
        name: "fission_product_count",
        prefix: "yieldA",
        line: 2,
        token: 4,
    },
];

/// A numeric table read from the first file whose name starts with
/// `prefix`; `columns` keeps a subset, in order
struct PrefixTable {
    name: &'static str,
    prefix: &'static str,
    columns: Option<&'static [usize]>,
}

const REPORT_TABLES: &[PrefixTable] = &[
    PrefixTable {
        name: "mean_emission_energy_by_a",
        prefix: "EavA",
        columns: None,
    },
    PrefixTable {
        name: "prompt_gamma_multiplicity_by_a",
        prefix: "nugA",
        columns: None,
    },
    PrefixTable {
        name: "prompt_neutron_multiplicity_by_a",
        prefix: "nunA",
        columns: None,
    },
    PrefixTable {
        name: "prompt_gamma_spectrum",
        prefix: "pfgs",
        columns: Some(&[0, 1]),
    },
    PrefixTable {
        name: "prompt_neutron_spectrum",
        prefix: "pfns",
        columns: Some(&[0, 1, 2]),
    },
    PrefixTable {
        name: "prompt_neutron_distribution",
        prefix: "Pnun",
        columns: None,
    },
    PrefixTable {
        name: "yields_by_a",
        prefix: "yieldA",
        columns: Some(&[0, 1, 2]),
    },
];

/// Data rows of a `#`-commented column file, restricted to `columns`.
/// Rows too short for the selection are dropped.
fn data_rows(text: &str, columns: Option<&[usize]>) -> Vec<Vec<f64>> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .collect();
    let (rows, skipped) = numeric_rows(&lines, Separator::Whitespace);
    if skipped > 0 {
        debug!(skipped, "Dropped non-numeric report lines");
    }
    match columns {
        None => rows,
        Some(columns) => rows
            .into_iter()
            .filter_map(|row| columns.iter().map(|&c| row.get(c).copied()).collect())
            .collect(),
    }
}

/// Read the auxiliary reports in `dir`. A file holding a summary scalar
/// must exist; a line or token missing inside it is logged and skipped.
/// Tables come from the same files and are left out, with a warning, when
/// their file is absent.
pub fn read_reports(dir: &Path) -> Result<Report, ExternalToolError> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(|e| ExternalToolError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    let find = |prefix: &str| names.iter().find(|n| n.starts_with(prefix));
    let read = |name: &str| {
        let path = dir.join(name);
        fs::read_to_string(&path).map_err(|e| ExternalToolError::io(&path, e))
    };

    let mut report = Report::new();
    for field in REPORT_FIELDS {
        let Some(name) = find(field.prefix) else {
            return Err(ExternalToolError::MissingOutput(
                dir.join(format!("{}*", field.prefix)),
            ));
        };
        let text = read(name.as_str())?;
        let lines: Vec<&str> = text.lines().collect();
        match token_at(&lines, field.line, field.token) {
            Some(value) => report.insert_scalar(field.name, value),
            None => warn!(field = field.name, file = %name, "Evaporation report field not found"),
        }
    }
    for table in REPORT_TABLES {
        let Some(name) = find(table.prefix) else {
            warn!(table = table.name, prefix = table.prefix, "Evaporation report file missing");
            continue;
        };
        let rows = data_rows(&read(name.as_str())?, table.columns);
        report.insert_table(table.name, rows);
    }
    debug!(
        entries = report.len(),
        tables = report.table_count(),
        "Parsed evaporation reports"
    );
    Ok(report)
}

/// Delete the working directory once reports are parsed
pub fn remove_work_dir(dir: &Path) -> Result<(), ExternalToolError> {
    remove_dir_if_exists(dir)
}
