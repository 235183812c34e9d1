use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use riskcat_core::{CatalogService, CoreConfig};
use riskcat_incarnation::IncarnationRequest;
use riskcat_migration::ChangeKind;
use riskcat_model::{
    Domain, DomainTemplate, Element, IncarnationLookup, ItemId, RequestMode, RiskDefinition,
    TailoringReferenceType, Unit,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

fn cli() -> Command {
    let path = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .long(name)
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help(help)
    };
    let elements = Arg::new("elements")
        .long("elements")
        .value_parser(value_parser!(PathBuf))
        .help("JSON array of existing elements");

    Command::new("riskcat")
        .version(riskcat_core::VERSION)
        .about("Catalog incarnation and domain template migration")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve catalog items into an incarnation plan")
                .arg(path("domain", "Domain JSON including its catalog items"))
                .arg(path("unit", "Target unit JSON"))
                .arg(elements.clone())
                .arg(
                    Arg::new("item")
                        .long("item")
                        .required(true)
                        .action(ArgAction::Append)
                        .help("Catalog item id to incarnate"),
                )
                .arg(Arg::new("mode").long("mode").help("MANUAL or DEFAULT"))
                .arg(
                    Arg::new("lookup")
                        .long("lookup")
                        .help("NEVER, FOR_REFERENCED_ITEMS, ALWAYS or SAME_VERSION"),
                )
                .arg(
                    Arg::new("include")
                        .long("include")
                        .action(ArgAction::Append)
                        .help("Reference type to follow"),
                )
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Reference type to skip"),
                )
                .arg(
                    Arg::new("apply")
                        .long("apply")
                        .action(ArgAction::SetTrue)
                        .help("Apply the plan and print the created elements"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Diff two versions of a risk definition")
                .arg(path("old", "Current risk definition JSON"))
                .arg(path("new", "Target risk definition JSON")),
        )
        .subcommand(
            Command::new("migrate")
                .about("Evaluate migrating a domain to a template version")
                .arg(path("domain", "Domain JSON"))
                .arg(path("template", "Target domain template JSON"))
                .arg(elements)
                .arg(
                    Arg::new("accept")
                        .long("accept")
                        .action(ArgAction::Append)
                        .help("Change kind to apply automatically"),
                ),
        )
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("--{name} is required"))
}

/// Parse every occurrence of a repeated flag
fn parse_all<T: FromStr>(args: &ArgMatches, name: &str) -> Result<Option<Vec<T>>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    args.get_many::<String>(name)
        .map(|values| {
            values
                .map(|v| v.parse::<T>().with_context(|| format!("invalid --{name} '{v}'")))
                .collect()
        })
        .transpose()
}

/// Parse an enum literal the way serde spells it
fn parse_literal<T: DeserializeOwned>(args: &ArgMatches, name: &str) -> Result<Option<T>> {
    args.get_one::<String>(name)
        .map(|v| {
            serde_json::from_value(serde_json::Value::String(v.to_uppercase()))
                .with_context(|| format!("invalid --{name} '{v}'"))
        })
        .transpose()
}

fn load_elements(args: &ArgMatches) -> Result<Vec<Element>> {
    args.get_one::<PathBuf>("elements")
        .map_or_else(|| Ok(Vec::new()), |path| read_json(path))
}

fn resolve(config: CoreConfig, args: &ArgMatches) -> Result<ExitCode> {
    let domain: Domain = read_json(path_arg(args, "domain")?)?;
    let unit: Unit = read_json(path_arg(args, "unit")?)?;
    let items: Vec<ItemId> = parse_all(args, "item")?.unwrap_or_default();

    let service = CatalogService::in_memory(config);
    service.repository().insert_unit(unit.clone());
    for element in load_elements(args)? {
        service.repository().insert_element(element);
    }

    let mut request = IncarnationRequest::new(unit.id, domain.id, items);
    if let Some(mode) = parse_literal::<RequestMode>(args, "mode")? {
        request = request.with_mode(mode);
    }
    if let Some(lookup) = parse_literal::<IncarnationLookup>(args, "lookup")? {
        request = request.with_lookup(lookup);
    }
    if let Some(include) = parse_all::<TailoringReferenceType>(args, "include")? {
        request = request.with_include(include);
    }
    if let Some(exclude) = parse_all::<TailoringReferenceType>(args, "exclude")? {
        request = request.with_exclude(exclude);
    }

    let graph = domain.graph()?;
    let plan = service.resolve_incarnation(&domain, &graph, &request)?;
    if args.get_flag("apply") {
        let applied = service.apply_incarnation(&domain, &graph, &plan)?;
        print_json(&applied)?;
    } else {
        print_json(&plan)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn diff(config: CoreConfig, args: &ArgMatches) -> Result<ExitCode> {
    let old: RiskDefinition = read_json(path_arg(args, "old")?)?;
    let new: RiskDefinition = read_json(path_arg(args, "new")?)?;
    if old.id != new.id {
        bail!("risk definitions '{}' and '{}' differ in id", old.id, new.id);
    }
    let changes = CatalogService::in_memory(config).diff_risk_definition(&old, &new);
    print_json(&changes)?;
    Ok(ExitCode::SUCCESS)
}

fn migrate(config: CoreConfig, args: &ArgMatches) -> Result<ExitCode> {
    let domain: Domain = read_json(path_arg(args, "domain")?)?;
    let template: DomainTemplate = read_json(path_arg(args, "template")?)?;
    let accepted: BTreeSet<ChangeKind> = parse_all(args, "accept")?
        .unwrap_or_default()
        .into_iter()
        .collect();

    let service = CatalogService::in_memory(config);
    for element in load_elements(args)? {
        service.repository().insert_element(element);
    }

    let outcome = service.evaluate_migration(&domain, &template, &accepted)?;
    print_json(&outcome)?;
    Ok(if outcome.is_migrated() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match matches.subcommand() {
        Some(("resolve", args)) => resolve(config, args),
        Some(("diff", args)) => diff(config, args),
        Some(("migrate", args)) => migrate(config, args),
        _ => bail!("unknown command"),
    }
}
