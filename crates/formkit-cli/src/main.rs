//! `formkit` command line

mod commands;
mod prompt;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use formkit_client::ClientConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn page_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("page")
                .long("page")
                .default_value("1")
                .value_parser(value_parser!(u32))
                .help("Page number, starting at 1"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .default_value("20")
                .value_parser(value_parser!(u32))
                .help("Entries per page"),
        )
}

fn form_arg() -> Arg {
    Arg::new("form").required(true).help("Form id")
}

fn cli() -> Command {
    Command::new("formkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build forms and fill them in from the terminal")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .help("Base URL of the form service"),
        )
        .subcommand(
            Command::new("show")
                .about("Print a form definition")
                .arg(form_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(page_args(Command::new("list").about("List forms")))
        .subcommand(
            Command::new("create")
                .about("Create a draft form")
                .arg(Arg::new("name").required(true).help("Form name")),
        )
        .subcommand(Command::new("delete").about("Delete a form").arg(form_arg()))
        .subcommand(
            Command::new("rename")
                .about("Rename a form")
                .arg(form_arg())
                .arg(Arg::new("name").required(true).help("New name")),
        )
        .subcommand(
            Command::new("add-card")
                .about("Append a card to a form")
                .arg(form_arg())
                .arg(Arg::new("title").required(true).help("Card title")),
        )
        .subcommand(
            Command::new("add-field")
                .about("Append a field to a card")
                .arg(form_arg())
                .arg(Arg::new("card").required(true).help("Card id"))
                .arg(
                    Arg::new("type")
                        .required(true)
                        .value_parser(value_parser!(formkit_core::FieldType))
                        .help("Field type, e.g. short_text or multiple_choice"),
                )
                .arg(Arg::new("label").required(true).help("Field label"))
                .arg(
                    Arg::new("required")
                        .long("required")
                        .action(ArgAction::SetTrue)
                        .help("Respondents must answer this field"),
                ),
        )
        .subcommand(page_args(
            Command::new("responses")
                .about("List submissions of a form")
                .arg(form_arg()),
        ))
        .subcommand(
            Command::new("fill")
                .about("Fill in a form interactively, resuming saved progress")
                .arg(form_arg()),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ClientConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(url) = matches.get_one::<String>("api-url") {
        config.api_url.clone_from(url);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    tracing::debug!(api_url = %config.api_url, "configuration loaded");
    let app = commands::App::new(config)?;

    match matches.subcommand() {
        Some(("show", args)) => app.show(required(args, "form")?, args.get_flag("json")).await,
        Some(("list", args)) => app.list(page(args)).await,
        Some(("create", args)) => app.create(required(args, "name")?).await,
        Some(("delete", args)) => app.delete(required(args, "form")?).await,
        Some(("rename", args)) => app.rename(required(args, "form")?, required(args, "name")?).await,
        Some(("add-card", args)) => {
            app.add_card(required(args, "form")?, required(args, "title")?)
                .await
        }
        Some(("add-field", args)) => {
            let field_type = *args
                .get_one::<formkit_core::FieldType>("type")
                .context("missing field type")?;
            app.add_field(
                required(args, "form")?,
                required(args, "card")?,
                field_type,
                required(args, "label")?,
                args.get_flag("required"),
            )
            .await
        }
        Some(("responses", args)) => app.responses(required(args, "form")?, page(args)).await,
        Some(("fill", args)) => app.fill(required(args, "form")?).await,
        _ => unreachable!("subcommand is required"),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{name}>"))
}

fn page(args: &ArgMatches) -> formkit_client::PageRequest {
    let page = args.get_one::<u32>("page").copied().unwrap_or(1);
    let limit = args.get_one::<u32>("limit").copied().unwrap_or(20);
    formkit_client::PageRequest::new(page, limit)
}
