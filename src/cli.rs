use std::io::Write;

use clap::{Arg, ArgMatches, Command};
use mongodb::bson::{Bson, Document};

use crate::collection::DocumentCollection;
use crate::config::ShelterConfig;
use crate::shelter::AnimalShelter;

pub fn cli() -> Command {
    Command::new("shelter")
        .about("Manage animal records in the shelter database")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("host")
                .long("host")
                .global(true)
                .help("MongoDB host (default: $SHELTER_HOST or localhost)")
                .value_name("HOST"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .global(true)
                .value_parser(clap::value_parser!(u16))
                .help("MongoDB port (default: $SHELTER_PORT or 27017)")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .global(true)
                .help("User to authenticate as against the admin database")
                .value_name("USER"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .global(true)
                .help("Password for --username")
                .value_name("PASSWORD"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Database holding the animal collection")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("collection")
                .long("collection")
                .global(true)
                .help("Collection holding the animal records")
                .value_name("NAME"),
        )
        .subcommand(Command::new("next-id").about("Print the next free animal_id"))
        .subcommand(
            Command::new("create")
                .about("Insert an animal record, assigning an animal_id if missing")
                .arg(json_arg("record", "Record to insert, as JSON")),
        )
        .subcommand(
            Command::new("read")
                .about("Print every record matching a query")
                .arg(json_arg("query", "Query to match, as JSON")),
        )
        .subcommand(
            Command::new("update")
                .about("Set fields on every record matching a query")
                .arg(json_arg("query", "Query to match, as JSON"))
                .arg(json_arg("set", "Fields to set, as JSON")),
        )
        .subcommand(
            Command::new("delete")
                .about("Remove every record matching a query")
                .arg(json_arg("query", "Query to match, as JSON")),
        )
}

fn json_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help).value_name("JSON")
}

/// Settings from the environment, overridden by any connection flags given.
pub fn config_from(matches: &ArgMatches) -> crate::Result<ShelterConfig> {
    let mut config = ShelterConfig::from_env()?;

    if let Some(host) = matches.get_one::<String>("host") {
        config.host = host.clone();
        config.uri = None;
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
        config.uri = None;
    }
    if let Some(username) = matches.get_one::<String>("username") {
        config.username = Some(username.clone());
        config.uri = None;
    }
    if let Some(password) = matches.get_one::<String>("password") {
        config.password = Some(password.clone());
        config.uri = None;
    }
    if let Some(db) = matches.get_one::<String>("db") {
        config.database_name = db.clone();
    }
    if let Some(collection) = matches.get_one::<String>("collection") {
        config.collection_name = collection.clone();
    }

    Ok(config)
}

pub async fn handle_cli() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    let config = config_from(&matches)?;

    let shelter = AnimalShelter::connect(&config).await?;
    run_then_close(shelter, &matches, &mut std::io::stdout()).await
}

/// Runs the subcommand and closes the shelter. A failed close is logged so
/// the subcommand's own result is what the caller sees.
pub async fn run_then_close<C: DocumentCollection>(
    shelter: AnimalShelter<C>,
    matches: &ArgMatches,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = run(&shelter, matches, out).await;
    if let Err(e) = shelter.close().await {
        tracing::warn!(error = %e, "failed to close connection");
    }

    result
}

/// Executes the chosen subcommand, writing its result to `out`.
pub async fn run<C: DocumentCollection>(
    shelter: &AnimalShelter<C>,
    matches: &ArgMatches,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("next-id", _)) => {
            writeln!(out, "{}", shelter.next_animal_id().await)?;
        }
        Some(("create", sub_matches)) => {
            let record = document_arg(sub_matches, "record")?;
            let created = shelter.create(record).await?;
            writeln!(out, "{}", if created { "created" } else { "not created" })?;
        }
        Some(("read", sub_matches)) => {
            let query = document_arg(sub_matches, "query")?;
            let records = shelter.read(query.as_ref()).await;
            let records: Vec<serde_json::Value> = records
                .into_iter()
                .map(|record| Bson::Document(record).into_relaxed_extjson())
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
        }
        Some(("update", sub_matches)) => {
            let query = document_arg(sub_matches, "query")?;
            let new_values = document_arg(sub_matches, "set")?;
            let modified = shelter.update(query.as_ref(), new_values.as_ref()).await?;
            writeln!(out, "modified {modified}")?;
        }
        Some(("delete", sub_matches)) => {
            let query = document_arg(sub_matches, "query")?;
            let deleted = shelter.delete(query.as_ref()).await?;
            writeln!(out, "deleted {deleted}")?;
        }
        _ => {
            cli().print_help()?;
        }
    }

    Ok(())
}

/// Parses a JSON object argument. Extended JSON such as `{"$oid": ..}` is honoured.
fn document_arg(
    matches: &ArgMatches,
    name: &str,
) -> Result<Option<Document>, Box<dyn std::error::Error>> {
    let Some(raw) = matches.get_one::<String>(name) else {
        return Ok(None);
    };

    let value: serde_json::Value = serde_json::from_str(raw)?;
    match Bson::try_from(value)? {
        Bson::Document(document) => Ok(Some(document)),
        _ => Err(format!("--{name} must be a JSON object").into()),
    }
}
