use anyhow::Context;
use bulk_mailer::adapters::template::sample_template_csv;
use clap::Parser;

#[derive(Parser)]
#[command(name = "sample-template")]
#[command(about = "Write a sample Name,Email recipient file")]
struct Args {
    /// Destination file
    #[arg(short, long, default_value = "sample_template.csv")]
    output: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data = sample_template_csv().context("building sample template")?;
    std::fs::write(&args.output, data)
        .with_context(|| format!("writing sample template to {}", args.output))?;

    println!("📁 Sample template saved to: {}", args.output);
    Ok(())
}
