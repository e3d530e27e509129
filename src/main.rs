use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use suite_pad::app::domain::messages::{DataFileRemoved, DataModified};
use suite_pad::app::services::tree_render::render_tree;
use suite_pad::{ChiefController, Command, EditorSettings, Publisher};

#[derive(Parser)]
#[command(name = "suitepad")]
#[command(about = "Inspect and edit Robot Framework test projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the suite tree of a project
    Tree {
        /// Project directory or data file
        path: PathBuf,
    },
    /// List registered resources and how often each is imported
    Resources {
        /// Project directory or data file
        path: PathBuf,
    },
    /// Delete a resource file from a project
    DeleteResource {
        /// Project directory or data file
        project: PathBuf,
        /// Resource file to delete
        resource: PathBuf,
        /// Also remove every import of the resource and save the importers
        #[arg(long)]
        with_imports: bool,
    },
}

/// Initialize tracing on stderr so stdout only carries command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "suite_pad=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_project(path: &Path) -> anyhow::Result<ChiefController> {
    let mut chief = ChiefController::new(Rc::new(Publisher::new()), EditorSettings::load());
    chief
        .load_data(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok(chief)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Tree { path } => {
            let chief = open_project(&path)?;
            print!("{}", render_tree(&chief.suite_nodes()));
        }
        Commands::Resources { path } => {
            let chief = open_project(&path)?;
            for id in chief.resources() {
                let Some(resource) = chief.controller(*id) else { continue };
                println!(
                    "{}\t{} import(s)",
                    resource.location().display(),
                    chief.importers_of(*id).len()
                );
            }
        }
        Commands::DeleteResource {
            project,
            resource,
            with_imports,
        } => {
            let mut chief = open_project(&project)?;
            let id = chief
                .resource_at(&resource)
                .with_context(|| format!("{} is not a resource of this project", resource.display()))?;

            chief.publisher().subscribe(|m: &DataFileRemoved| {
                if let Some(source) = &m.source {
                    println!("removed {}", source.display());
                }
                Ok(())
            });
            let modified = Rc::new(std::cell::RefCell::new(Vec::new()));
            let sink = modified.clone();
            chief.publisher().subscribe(move |m: &DataModified| {
                sink.borrow_mut().push(m.controller);
                Ok(())
            });

            let command = if with_imports {
                Command::DeleteResourceAndImports
            } else {
                Command::DeleteFile
            };
            chief.execute(id, command)?;

            let importers: Vec<_> = modified.borrow().clone();
            for importer in importers {
                chief.execute(importer, Command::SaveFile)?;
                if let Some(ctrl) = chief.controller(importer) {
                    println!("updated {}", ctrl.location().display());
                }
            }
        }
    }

    Ok(())
}
