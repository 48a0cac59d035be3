use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use cohort_intake::error::AppError;
use cohort_intake::workflows::intake::{FormSchema, Section};

#[derive(Parser, Debug)]
#[command(
    name = "Cohort Intake",
    about = "Run the intake, admissions, and cohort enrollment service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk applicants from intake to attendance in-process and print the outcome
    Demo(DemoArgs),
    /// Print the default intake form, section by section
    Schema(SchemaArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SchemaArgs {
    /// Emit the schema as JSON instead of a listing
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Schema(args) => print_schema(args),
    }
}

fn print_schema(args: SchemaArgs) -> Result<(), AppError> {
    let schema = FormSchema::default();
    if args.json {
        let rendered = serde_json::to_string_pretty(&schema)
            .map_err(|err| AppError::Demo(format!("schema could not be rendered: {err}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Intake form (revision {})", schema.revision());
    for section in Section::ordered() {
        let mut fields = schema.section_fields(section).peekable();
        if fields.peek().is_none() {
            continue;
        }
        println!("\n{}", section.label());
        for field in fields {
            let marker = if field.required { "*" } else { " " };
            println!(
                "  {marker} {:<18} {:<14} {}",
                field.id.as_str(),
                field.kind.label(),
                field.label
            );
            if !field.options.is_empty() {
                println!("      options: {}", field.options.join(" | "));
            }
        }
    }
    Ok(())
}
