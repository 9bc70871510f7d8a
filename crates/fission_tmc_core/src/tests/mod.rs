//! Integration tests for the campaign engine
//!
//! Tests are organized by topic:
//! - `sampler` - Magnitude sampling and perturbation rules
//! - `reducer` - Yield reduction scenarios and invariants
//! - `executor` - Trial lifecycle against scripted external programs
//! - `scheduler` - Planning and both scheduling modes
//! - `persistence` - Campaign files, reload and merge
//!
//! External programs are replaced by [`ScriptedGenerator`] and
//! [`ScriptedEvaporator`], which write the files the real codes would.

mod reducer;
mod sampler;
mod scheduler;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ExternalToolError;
use crate::events::RawEvent;
use crate::executor::{EvaporationSettings, ExecutorSettings, TrialExecutor};
use crate::external::generator::PARAMETER_FILE;
use crate::external::{ExternalProgram, Invocation};
use crate::model::Reaction;

pub(crate) const U235: Reaction = Reaction {
    z_target: 92,
    a_compound: 236,
    energy_mev: 2.53e-8,
};

/// One event line in the generator's listing layout
pub(crate) fn event_line(z_target: u16, event: &RawEvent) -> String {
    let mut fields = vec!["0".to_string(); 23];
    fields[0] = z_target.to_string();
    fields[2] = event.z_light.to_string();
    fields[3] = event.z_heavy.to_string();
    fields[4] = event.a_light.to_string();
    fields[5] = event.a_heavy.to_string();
    fields[18] = event.exc_light.to_string();
    fields[19] = event.exc_heavy.to_string();
    fields[22] = event.tke.to_string();
    fields.join(" ")
}

/// `count` copies of a split, with varying excitation energies
pub(crate) fn split(
    count: usize,
    light: (u16, u16),
    heavy: (u16, u16),
) -> impl Iterator<Item = RawEvent> {
    (0..count).map(move |i| {
        let spread = i as f32;
        RawEvent::new(light, heavy, 10.0 + spread, 8.0 - 0.5 * spread, 170.0 + spread)
    })
}

/// A listing with 9 retained events over two splits and one singleton
pub(crate) fn standard_listing(z_target: u16) -> String {
    let mut text = String::from("* generated listing\n");
    let events = split(5, (38, 96), (54, 140))
        .chain(split(4, (40, 100), (52, 136)))
        .chain(split(1, (36, 90), (56, 146)));
    for event in events {
        writeln!(text, "{}", event_line(z_target, &event)).unwrap();
    }
    text
}

/// What the scripted generator does when run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Script {
    /// Write the standard listing and a report
    Succeed,
    /// Write an empty listing
    EmptyOutput,
    /// Exit with an error, writing nothing
    Crash,
}

/// Report with one summary scalar and the gamma multiplicity table
pub(crate) const GENERATOR_REPORT: &str = "\
a b c 7.25
      </Gamma_multiplicity>
--- Mass-dependent gamma multiplicity (from fragments) ---
h
h
  A   <Ng>
  96  4.25
  140 3.75
f
f
f
f
--- Total gamma-multiplicity distribution (emission from fragments) ---
";

/// Neutron energy over pre-neutron mass for A = 96..98
pub(crate) const GENERATOR_DUMP: &str = "\
S: TITLE(Mean neutron energy over pre-neutron mass (from fragments in fragment frame))
h
h
h
h
h
A from : 96 to 98
1.25, 1.5,
1.75,
f
f
f
S: ANALYZER(ENApostfs)
";

/// Stands in for the event generator
pub(crate) struct ScriptedGenerator {
    reaction: Reaction,
    script: Script,
    runs: AtomicUsize,
    /// Parameter file contents seen per run, keyed by working directory name
    parameter_files: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(reaction: Reaction, script: Script) -> Self {
        Self {
            reaction,
            script,
            runs: AtomicUsize::new(0),
            parameter_files: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub(crate) fn parameter_files(&self) -> Vec<(String, String)> {
        self.parameter_files.lock().unwrap().clone()
    }
}

impl ExternalProgram for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted-generator"
    }

    fn run(&self, invocation: &Invocation) -> Result<(), ExternalToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let dir = &invocation.working_dir;
        let parameters = fs::read_to_string(dir.join(PARAMETER_FILE)).unwrap_or_default();
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.parameter_files
            .lock()
            .unwrap()
            .push((dir_name, parameters));

        if self.script == Script::Crash {
            return Err(ExternalToolError::NonZeroExit {
                program: self.name().to_string(),
                code: Some(3),
                dir: dir.clone(),
            });
        }
        let out = dir.join("out");
        fs::create_dir_all(&out).unwrap();
        let listing = match self.script {
            Script::Succeed => standard_listing(self.reaction.z_target),
            _ => String::new(),
        };
        fs::write(out.join(format!("{}.lmd", self.reaction.label())), listing).unwrap();
        fs::write(
            out.join(format!(
                "GEF_{}_{}_n.dat",
                self.reaction.z_target, self.reaction.a_compound
            )),
            GENERATOR_REPORT,
        )
        .unwrap();
        let dump = dir.join("dmp").join(self.reaction.label());
        fs::create_dir_all(&dump).unwrap();
        fs::write(dump.join("EN.dmp"), GENERATOR_DUMP).unwrap();
        Ok(())
    }
}

/// Stands in for the evaporation code: checks its library file exists and
/// writes the prefixed reports
pub(crate) struct ScriptedEvaporator {
    library_dir: PathBuf,
    libraries_seen: AtomicUsize,
}

impl ScriptedEvaporator {
    pub(crate) fn new(library_dir: &Path) -> Self {
        Self {
            library_dir: library_dir.to_path_buf(),
            libraries_seen: AtomicUsize::new(0),
        }
    }

    /// Library files present across all runs, counted at run time
    pub(crate) fn libraries_seen(&self) -> usize {
        self.libraries_seen.load(Ordering::SeqCst)
    }
}

impl ExternalProgram for ScriptedEvaporator {
    fn name(&self) -> &str {
        "scripted-evaporator"
    }

    fn run(&self, invocation: &Invocation) -> Result<(), ExternalToolError> {
        let libraries = fs::read_dir(&self.library_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        self.libraries_seen.fetch_add(libraries, Ordering::SeqCst);
        let dir = &invocation.working_dir;
        let reports = [
            ("pfgs.fis", "#\n#\n#\n# E-av = 0.85 MeV\n 0.1 2.5\n"),
            ("pfns.fis", "#\n#\n#\n# E-av = 2.01 MeV\n 0.5 0.3 0.4\n"),
            ("Pnug.fis", "#\n#\n# nu prompt gamma bar 8.12\n"),
            ("Pnun.fis", "#\n#\n# nu prompt n bar 2.43\n 2 0.3\n"),
            ("nugA.fis", "#\n#\n# a b c d 8.0\n 96 4.1\n 140 3.9\n"),
            ("nunA.fis", "#\n#\n# a b c d 2.4\n 96 1.2\n 140 1.1\n"),
            ("yieldA.fis", "#\n#\n# a b c 512\n 96 0.05 0.06\n"),
        ];
        for (name, text) in reports {
            fs::write(dir.join(name), text).unwrap();
        }
        Ok(())
    }
}

/// Lets a test keep a handle on a program the executor owns
impl<P: ExternalProgram> ExternalProgram for Arc<P> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn run(&self, invocation: &Invocation) -> Result<(), ExternalToolError> {
        self.as_ref().run(invocation)
    }
}

/// Executor over a scripted generator rooted at `root`
pub(crate) fn scripted_executor(
    root: &Path,
    script: Script,
) -> (TrialExecutor, Arc<ScriptedGenerator>) {
    let generator = Arc::new(ScriptedGenerator::new(U235, script));
    let settings = ExecutorSettings::new(U235, 100_000, root.join("generator_work"));
    let executor = TrialExecutor::new(settings, Box::new(Arc::clone(&generator)));
    (executor, generator)
}

/// Executor with the evaporation stage enabled
pub(crate) fn scripted_executor_with_evaporation(
    root: &Path,
) -> (TrialExecutor, Arc<ScriptedEvaporator>) {
    let library_dir = root.join("library");
    let evaporator = Arc::new(ScriptedEvaporator::new(&library_dir));
    let (executor, _) = scripted_executor(root, Script::Succeed);
    let executor = executor.with_evaporation(
        EvaporationSettings {
            work_root: root.join("evaporation_work"),
            library_dir,
        },
        Box::new(Arc::clone(&evaporator)),
    );
    (executor, evaporator)
}
