//! Fission event generator: working directory layout, input files and the
//! auxiliary report
//!
//! Layout of one trial directory:
//!
//! ```text
//! GEF_{trial}/
//!   file.in              points at the input deck
//!   MyParameters.dat     `name = value` overrides, empty for the baseline
//!   in/{Sym}{A-1}EN.in   iterations, energy, options, target
//!   out/                 event listing and report (written by the generator)
//!   ctl/ dmp/ tmp/       generator scratch
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CampaignError, ExternalToolError};
use crate::external::{
    Invocation, Separator, StdinSource, ensure_dir, find_anchor, numeric_rows,
    remove_dir_if_exists, token_at, write_file,
};
use crate::format::float_literal;
use crate::model::{Perturbation, Reaction, Report, TrialId};

pub const PARAMETER_FILE: &str = "MyParameters.dat";
pub const CONTROL_FILE: &str = "file.in";
const INPUT_DIR: &str = "in";
const OUTPUT_DIR: &str = "out";

/// Folders the generator takes as proof of a finished run
const STALE_DIRS: [&str; 4] = ["ctl", "dmp", "out", "tmp"];

/// Events produced per input-deck iteration
pub const EVENTS_PER_ITERATION: u64 = 100_000;

/// The generator only waits for an acknowledgement on stdin
pub const ACKNOWLEDGEMENT: &[u8] = b"\n";

const OPTIONS: &str = "Options(global,MyParameters,lmd+)";
const PROJECTILE: &str = "EN";

/// Trial working directory under `root`
#[must_use]
pub fn work_dir(root: &Path, trial: &TrialId) -> PathBuf {
    root.join(format!("GEF_{trial}"))
}

/// Create the directory and erase any output left by an earlier run
pub fn prepare_work_dir(dir: &Path) -> Result<(), ExternalToolError> {
    ensure_dir(dir)?;
    for stale in STALE_DIRS {
        remove_dir_if_exists(&dir.join(stale))?;
    }
    Ok(())
}

/// Write the control file, input deck and parameter overrides
pub fn write_inputs(
    dir: &Path,
    reaction: &Reaction,
    events: u64,
    overrides: &[Perturbation],
) -> Result<(), CampaignError> {
    let symbol = reaction.symbol()?;
    let deck_name = format!("{symbol}{}{PROJECTILE}.in", reaction.a_target());

    write_file(
        &dir.join(CONTROL_FILE),
        &format!("\"{INPUT_DIR}/{deck_name}\"\nEND"),
    )?;

    let input_dir = dir.join(INPUT_DIR);
    remove_dir_if_exists(&input_dir)?;
    ensure_dir(&input_dir)?;
    let iterations = (events / EVENTS_PER_ITERATION).max(1);
    write_file(
        &input_dir.join(&deck_name),
        &format!(
            "{iterations}\n{}\n{OPTIONS}\n{}, {}, \"{PROJECTILE}\"\nEND",
            float_literal(reaction.energy_mev),
            reaction.z_target,
            reaction.a_compound,
        ),
    )?;

    let parameter_file = dir.join(PARAMETER_FILE);
    let parameters = render_parameters(overrides)
        .map_err(|e| ExternalToolError::io(&parameter_file, io::Error::other(e)))?;
    write_file(&parameter_file, &parameters)?;
    Ok(())
}

/// `name = value` lines, one per override
pub fn render_parameters(overrides: &[Perturbation]) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    for p in overrides {
        writeln!(out, "{} = {}", p.parameter, p.value)?;
    }
    Ok(out)
}

/// Run description for the generator in `dir`
#[must_use]
pub fn invocation(dir: &Path) -> Invocation {
    Invocation {
        working_dir: dir.to_path_buf(),
        stdin: StdinSource::Bytes(ACKNOWLEDGEMENT.to_vec()),
        stdout: None,
    }
}

/// Per-event listing
#[must_use]
pub fn event_file(dir: &Path, reaction: &Reaction) -> PathBuf {
    dir.join(OUTPUT_DIR).join(format!("{}.lmd", reaction.label()))
}

/// Auxiliary summary report
#[must_use]
pub fn report_file(dir: &Path, reaction: &Reaction) -> PathBuf {
    dir.join(OUTPUT_DIR).join(format!(
        "GEF_{}_{}_n.dat",
        reaction.z_target, reaction.a_compound
    ))
}

/// Histogram dump holding the mean neutron energy over pre-neutron mass
#[must_use]
pub fn dump_file(dir: &Path, reaction: &Reaction) -> PathBuf {
    dir.join("dmp").join(reaction.label()).join("EN.dmp")
}

/// A scalar located relative to an anchor line
struct AnchoredField {
    name: &'static str,
    anchor: &'static str,
    offset: isize,
    token: usize,
}

/// Rows from `start` + `skip` up to `end` - `stop_short`
struct AnchoredTable {
    name: &'static str,
    start: &'static str,
    skip: usize,
    end: &'static str,
    stop_short: usize,
    separator: Separator,
}

const A_TKE_PRE: &str = "--- A-TKE spectrum (pre-neutron)---";
const NEUTRON_LIGHT: &str = "--- Multiplicity distribution of prompt neutrons (light fragment) ---";
const EN_TITLE: &str =
    "S: TITLE(Mean neutron energy over pre-neutron mass (from fragments in fragment frame))";

const REPORT_FIELDS: &[AnchoredField] = &[
    AnchoredField {
        name: "mean_gamma_multiplicity",
        anchor: "</Gamma_multiplicity>",
        offset: -1,
        token: 3,
    },
    AnchoredField {
        name: "mean_gamma_energy",
        anchor: "</E_gammas>",
        offset: -2,
        token: 3,
    },
    AnchoredField {
        name: "mean_prompt_neutron_multiplicity",
        anchor: NEUTRON_LIGHT,
        offset: -9,
        token: 4,
    },
    AnchoredField {
        name: "std_dev_prompt_neutron_multiplicity",
        anchor: NEUTRON_LIGHT,
        offset: -8,
        token: 3,
    },
    AnchoredField {
        name: "mean_neutron_energy",
        anchor: "</Nspectrum>",
        offset: 3,
        token: 4,
    },
    AnchoredField {
        name: "mean_tke_pre_neutron",
        anchor: "--- TXE spectrum (bins with zero content suppressed) ---",
        offset: -5,
        token: 4,
    },
    AnchoredField {
        name: "mean_q_value",
        anchor: "--- TKE spectrum (pre- and post-neutron) (bins with zero content suppressed) ---",
        offset: -4,
        token: 4,
    },
    AnchoredField {
        name: "mean_txe",
        anchor: "--- A-Ekin spectrum (pre-neutron)---",
        offset: -4,
        token: 4,
    },
    AnchoredField {
        name: "tke_by_pre_a_first_a",
        anchor: A_TKE_PRE,
        offset: 3,
        token: 4,
    },
    AnchoredField {
        name: "tke_by_pre_a_last_a",
        anchor: A_TKE_PRE,
        offset: 3,
        token: 6,
    },
    AnchoredField {
        name: "tke_by_pre_a_first_tke",
        anchor: A_TKE_PRE,
        offset: 3,
        token: 11,
    },
    AnchoredField {
        name: "tke_by_pre_a_last_tke",
        anchor: A_TKE_PRE,
        offset: 3,
        token: 13,
    },
];

const REPORT_TABLES: &[AnchoredTable] = &[
    AnchoredTable {
        name: "gamma_multiplicity_by_a",
        start: "--- Mass-dependent gamma multiplicity (from fragments) ---",
        skip: 4,
        end: "--- Total gamma-multiplicity distribution (emission from fragments) ---",
        stop_short: 4,
        separator: Separator::Whitespace,
    },
    AnchoredTable {
        name: "prompt_neutron_multiplicity_by_pre_a",
        start: "Apre  Nmean  Nmean          Multiplicity distribution, unnormalized (0 to 16)",
        skip: 2,
        end: "Apost  Nmean  Nmean         Multiplicity distribution, unnormalized (0 to 16)",
        stop_short: 1,
        separator: Separator::Whitespace,
    },
    AnchoredTable {
        name: "tke_by_pre_a",
        start: A_TKE_PRE,
        skip: 8,
        end: "--- A-TKE spectrum (post-neutron)---",
        stop_short: 2,
        separator: Separator::Whitespace,
    },
];

const DUMP_FIELDS: &[AnchoredField] = &[
    AnchoredField {
        name: "neutron_energy_by_pre_a_first_a",
        anchor: EN_TITLE,
        offset: 6,
        token: 3,
    },
    AnchoredField {
        name: "neutron_energy_by_pre_a_last_a",
        anchor: EN_TITLE,
        offset: 6,
        token: 5,
    },
];

const DUMP_TABLES: &[AnchoredTable] = &[AnchoredTable {
    name: "neutron_energy_by_pre_a",
    start: EN_TITLE,
    skip: 7,
    end: "S: ANALYZER(ENApostfs)",
    stop_short: 3,
    separator: Separator::Comma,
}];

fn parse_fields(lines: &[&str], fields: &[AnchoredField], report: &mut Report) {
    for field in fields {
        let value = find_anchor(lines, field.anchor)
            .and_then(|anchor| anchor.checked_add_signed(field.offset))
            .and_then(|line| token_at(lines, line, field.token));
        match value {
            Some(value) => report.insert_scalar(field.name, value),
            None => warn!(field = field.name, "Generator report field not found"),
        }
    }
}

fn parse_tables(lines: &[&str], tables: &[AnchoredTable], report: &mut Report) {
    for table in tables {
        let window = find_anchor(lines, table.start)
            .zip(find_anchor(lines, table.end))
            .and_then(|(start, end)| {
                let from = start + table.skip;
                let to = end.checked_sub(table.stop_short)?;
                lines.get(from..to)
            });
        let Some(window) = window else {
            warn!(table = table.name, "Generator report table not found");
            continue;
        };
        let (rows, skipped) = numeric_rows(window, table.separator);
        if skipped > 0 {
            debug!(table = table.name, skipped, "Dropped non-numeric table lines");
        }
        report.insert_table(table.name, rows);
    }
}

/// Extract the summary scalars and the mass-dependent tables. Entries
/// whose anchors or tokens are missing are logged and left out.
#[must_use]
pub fn parse_report(text: &str) -> Report {
    let lines: Vec<&str> = text.lines().collect();
    let mut report = Report::new();
    parse_fields(&lines, REPORT_FIELDS, &mut report);
    parse_tables(&lines, REPORT_TABLES, &mut report);
    report
}

/// Add the neutron-energy-over-mass histogram from the dump file
pub fn parse_dump(text: &str, report: &mut Report) {
    let lines: Vec<&str> = text.lines().collect();
    parse_fields(&lines, DUMP_FIELDS, report);
    parse_tables(&lines, DUMP_TABLES, report);
}

/// Read the report and the dump from the trial directory. A missing report
/// means the run failed; a missing dump only loses its histogram.
pub fn read_report(dir: &Path, reaction: &Reaction) -> Result<Report, ExternalToolError> {
    let path = report_file(dir, reaction);
    if !path.is_file() {
        return Err(ExternalToolError::MissingOutput(path));
    }
    let text = fs::read_to_string(&path).map_err(|e| ExternalToolError::io(&path, e))?;
    let mut report = parse_report(&text);

    let dump = dump_file(dir, reaction);
    match fs::read_to_string(&dump) {
        Ok(text) => parse_dump(&text, &mut report),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %dump.display(), "Generator dump file missing");
        }
        Err(e) => return Err(ExternalToolError::io(&dump, e)),
    }
    Ok(report)
}
