//! Thin CLI over `Corpus::build`: check a corpus, or dump its resolved model.
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::corpus::{Corpus, Options};
use crate::ir::Model;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// resolve a directory of JSON view files and infer the view types they imply
#[derive(Parser, Debug)]
#[command(name = "json-views", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the whole pipeline and report every error found
    Check(CheckOut),
    /// run the whole pipeline and print the resolved model as JSON
    Model(ModelOut),
}

#[derive(Args, Debug, Clone)]
struct CorpusSettings {
    /// corpus root directory
    root: PathBuf,

    /// glob (relative to the root) of files to leave out; repeatable
    #[arg(long, num_args = 1..)]
    ignore: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    corpus: CorpusSettings,
}

#[derive(clap::Parser, Debug)]
struct ModelOut {
    #[command(flatten)]
    corpus: CorpusSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CorpusSettings {
    fn options(&self) -> anyhow::Result<Options> {
        let ignore = self
            .ignore
            .iter()
            .map(|raw| glob::Pattern::new(raw).with_context(|| format!("invalid --ignore pattern `{raw}`")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Options { ignore })
    }

    fn build(&self) -> anyhow::Result<Model> {
        let model = Corpus::build(self.root.clone(), self.options()?)?;
        Ok(model)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Check(target) => {
                let model = target.corpus.build()?;
                let fields: usize = model.views.iter().map(|v| v.fields.len()).sum();
                println!(
                    "{}: {} views, {} fields",
                    target.corpus.root.display(),
                    model.views.len(),
                    fields,
                );
            }
            Command::Model(target) => {
                let model = target.corpus.build()?;
                let src = serde_json::to_string_pretty(&model)?;
                match target.out.as_ref() {
                    Some(out) => {
                        if let Some(parent) = out.parent() {
                            std::fs::create_dir_all(parent)
                                .with_context(|| format!("creating {}", parent.display()))?;
                        }
                        std::fs::write(out, &src).with_context(|| format!("writing {}", out.display()))?;
                    }
                    None => println!("{src}"),
                }
            }
        }
        Ok(())
    }
}
