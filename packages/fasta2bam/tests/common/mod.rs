//! Fake bioinformatics tools for pipeline tests
//!
//! Each fake is a small POSIX shell script that appends its command line to a
//! shared log and produces just enough output for the next stage to consume.

#![allow(dead_code)]

use fasta2bam::{JobRequest, PipelineConfig, ToolPaths};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

/// Scripts are written then executed; running tests one at a time keeps a
/// concurrent fork from holding a script open for writing (ETXTBSY).
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// Which fake tool exits with status 3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failing {
    Nothing,
    /// The simulator run with this seed
    SimulatorSeed(u64),
    /// Exits 4 after writing part of its output
    Aligner,
    Sorter,
    /// `samtools view` exits 5 after draining its input
    Converter,
    Index,
}

pub struct FakeTools {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl FakeTools {
    pub fn new(failing: Failing) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("tools.log");
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();

        let fail_seed = match failing {
            Failing::SimulatorSeed(seed) => seed.to_string(),
            _ => "none".to_string(),
        };
        let simulator = write_script(
            &bin,
            "art_illumina",
            &format!(
                r#"printf '%s\n' "art_illumina $*" >> "{log}"
while [ $# -gt 0 ]; do
  case "$1" in
    -o) prefix="$2"; shift ;;
    -rs) seed="$2"; shift ;;
  esac
  shift
done
if [ "$seed" = "{fail_seed}" ]; then exit 3; fi
printf 'seed=%s/1\n' "$seed" > "${{prefix}}1.fq"
printf 'seed=%s/2\n' "$seed" > "${{prefix}}2.fq"
"#,
                log = log.display(),
                fail_seed = fail_seed,
            ),
        );

        let align_exit = if failing == Failing::Aligner { 4 } else { 0 };
        let aligner = write_script(
            &bin,
            "bwa",
            &format!(
                r#"printf '%s\n' "bwa $*" >> "{log}"
for a in "$@"; do prev="$last"; last="$a"; done
cat "$prev" "$last"
exit {align_exit}
"#,
                log = log.display(),
                align_exit = align_exit,
            ),
        );

        let sort_exit = if failing == Failing::Sorter { 3 } else { 0 };
        let sorter = write_script(
            &bin,
            "bamsormadup",
            &format!(
                r#"printf '%s\n' "bamsormadup $*" >> "{log}"
for a in "$@"; do
  case "$a" in
    tmpfile=*) tmp="${{a#tmpfile=}}" ;;
  esac
done
touch "${{tmp}}0001.tmp"
cat
exit {sort_exit}
"#,
                log = log.display(),
                sort_exit = sort_exit,
            ),
        );

        let index_exit = if failing == Failing::Index { 3 } else { 0 };
        let view_exit = if failing == Failing::Converter { 5 } else { 0 };
        let samtools = write_script(
            &bin,
            "samtools",
            &format!(
                r#"printf '%s\n' "samtools $*" >> "{log}"
case "$1" in
  view)
    while [ $# -gt 0 ]; do
      case "$1" in
        -o) out="$2"; shift ;;
      esac
      shift
    done
    if [ {view_exit} -ne 0 ]; then cat > /dev/null; exit {view_exit}; fi
    cat > "$out"
    ;;
  index)
    if [ {index_exit} -ne 0 ]; then exit {index_exit}; fi
    for a in "$@"; do last="$a"; done
    touch "$last.idx"
    ;;
esac
"#,
                log = log.display(),
                index_exit = index_exit,
                view_exit = view_exit,
            ),
        );

        let config = PipelineConfig {
            tools: ToolPaths {
                simulator,
                aligner,
                sorter,
                samtools,
            },
            ..PipelineConfig::default()
        };

        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Every tool invocation so far, one command line per line
    pub fn log(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("tools.log")).unwrap_or_default()
    }

    pub fn request(&self, output: &str, coverage: u32, processes: usize, seed: u64) -> JobRequest {
        let fasta = self.dir.path().join("genome.fa");
        std::fs::write(&fasta, b">chr1\nACGTACGTACGT\n").unwrap();
        JobRequest {
            fasta_input: fasta.clone(),
            fasta_ref: fasta,
            output: self.dir.path().join(output),
            coverage,
            processes,
            seed,
        }
    }

    /// Files left in the work directory, tools and inputs excluded
    pub fn leftovers(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !matches!(name.as_str(), "bin" | "tools.log" | "genome.fa"))
            .collect();
        names.sort();
        names
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
