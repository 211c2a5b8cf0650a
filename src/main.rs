use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

use feynedit::Document;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect feynedit diagram snapshots", long_about = None)]
struct Cli {
    /// Diagram snapshot file (.json)
    #[arg(value_name = "DIAGRAM_FILE")]
    diagram_file: Utf8PathBuf,

    /// Print one human-readable line per element instead of JSON
    #[arg(long)]
    describe: bool,

    /// Print element counts instead of JSON
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let doc = Document::load_from_file(cli.diagram_file.as_std_path())
        .with_context(|| format!("Failed to load {}", cli.diagram_file))?;

    if cli.stats {
        let mut vertices = 0usize;
        let mut lines = 0usize;
        let mut loops = 0usize;
        let mut texts = 0usize;
        let mut groups = 0usize;
        for e in doc.elements() {
            match e {
                feynedit::Element::Vertex(_) => vertices += 1,
                feynedit::Element::Line(_) => lines += 1,
                feynedit::Element::Loop(_) => loops += 1,
                feynedit::Element::Annotation(_) => texts += 1,
                feynedit::Element::Group(_) => groups += 1,
            }
        }
        println!("elements: {}", doc.elements().len());
        println!("  vertices: {vertices}");
        println!("  lines:    {lines}");
        println!("  loops:    {loops}");
        println!("  texts:    {texts}");
        println!("  groups:   {groups}");
    } else if cli.describe {
        for e in doc.elements() {
            println!("{}", e.description());
        }
    } else {
        println!("{}", doc.save_to_string()?);
    }
    Ok(())
}
