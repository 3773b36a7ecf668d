//! `fieldpin` - CLI for fieldpin
//!
//! This binary manages the field catalog and stored pins, and shows how a
//! record's custom fields resolve against them.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::{Map, Value};

use fieldpin::cli::{
    CatalogCommand, Cli, Command, ConfigCommand, OutputFormat, PinsCommand, RenderCommand,
    SuggestCommand,
};
use fieldpin::{
    init_logging, Config, FieldChoice, FieldId, FieldManager, ListPinEntry, PinKey, PinToggle,
    RecordSnapshot, SelectedField, Storage, SuggestionService, TracingSink,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Catalog(cmd) => handle_catalog(&config, cmd),
        Command::Pins(cmd) => handle_pins(&config, cmd).await,
        Command::Render(cmd) => handle_render(&config, &cmd),
        Command::Suggest(cmd) => handle_suggest(&config, cmd).await,
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Arc<Storage>> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("could not open pin database at {}", path.display()))?;
    Ok(Arc::new(storage))
}

/// Start an editing session over the stored catalog and pins.
fn open_session(
    config: &Config,
    storage: &Arc<Storage>,
    pin_mode: bool,
) -> anyhow::Result<FieldManager> {
    let mut engine = config.engine.clone();
    engine.pin_mode = pin_mode;

    let mut manager = FieldManager::new(
        &engine,
        storage.clone(),
        storage.clone(),
        Arc::new(TracingSink),
    )?;
    manager.set_catalog(storage.catalog()?);
    Ok(manager)
}

fn handle_catalog(config: &Config, cmd: CatalogCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        CatalogCommand::List { format } => {
            let catalog = storage.catalog()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&catalog)?),
                OutputFormat::Plain => {
                    if catalog.is_empty() {
                        println!("No catalog fields.");
                    }
                    for entry in catalog.entries() {
                        println!("{:>6}  {}", entry.id, entry.name);
                    }
                }
            }
        }
        CatalogCommand::Add { name } => {
            let entry = storage.add_field(&name)?;
            println!("{}  {}", entry.id, entry.name);
        }
    }
    Ok(())
}

async fn handle_pins(config: &Config, cmd: PinsCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        PinsCommand::Show { format } => {
            let pins = storage.load_pins()?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&pins.to_legacy())?);
                }
                OutputFormat::Plain => {
                    match pins.list_pin() {
                        Some(list) => {
                            println!("List pin ({} fields)", list.len());
                            for member in list {
                                println!("  {:>6}  {}", member.value, member.label);
                            }
                        }
                        None => println!("List pin: none"),
                    }
                    println!("Field pins ({})", pins.field_pins().len());
                    for entry in pins.field_pins() {
                        println!("  {:>6}  {} = {}", entry.value, entry.label, entry.field_value);
                    }
                }
            }
        }
        PinsCommand::Pin { field_id, value } => {
            pin_value(config, &storage, FieldId::from(field_id), &value).await?;
        }
        PinsCommand::Unpin { field_id } => {
            let key = PinKey::Field(FieldId::from(field_id));
            if storage.delete_pin(&key)? {
                println!("Removed pin {key}");
            } else {
                println!("No pin {key}");
            }
        }
        PinsCommand::PinList { field_ids } => {
            let catalog = storage.catalog()?;
            let members: Vec<ListPinEntry> = field_ids
                .into_iter()
                .map(FieldId::from)
                .map(|id| ListPinEntry {
                    label: catalog.resolve_label(&id, &config.engine.unknown_label),
                    value: id,
                })
                .collect();
            storage.save_list_pin(&members)?;
            println!("Pinned list of {} fields", members.len());
        }
        PinsCommand::UnpinList => {
            if storage.delete_pin(&PinKey::List)? {
                println!("Removed list pin");
            } else {
                println!("No list pin");
            }
        }
        PinsCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            let map: Map<String, Value> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON object", file.display()))?;
            let pins = storage.import_legacy(&map)?;
            println!(
                "Imported {} field pins{}",
                pins.field_pins().len(),
                if pins.is_list_pinned() { " and the list pin" } else { "" }
            );
        }
        PinsCommand::Export { output } => {
            let json = serde_json::to_string_pretty(&storage.export_legacy()?)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("could not write {}", path.display()))?;
                    println!("Exported pins to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
    }
    Ok(())
}

/// Pin a value the way the editor does: attach the field, set it, pin it.
async fn pin_value(
    config: &Config,
    storage: &Arc<Storage>,
    id: FieldId,
    value: &str,
) -> anyhow::Result<()> {
    let mut manager = open_session(config, storage, true)?;

    let Some(entry) = manager.catalog().get(&id).cloned() else {
        bail!("field {id} is not in the catalog");
    };
    if !manager.selected_fields().iter().any(|f| f.value == id) {
        manager.select_field(FieldChoice::Existing(entry)).await?;
    }
    let index = manager
        .selected_fields()
        .iter()
        .position(|f| f.value == id)
        .with_context(|| format!("field {id} could not be attached"))?;

    manager.set_field_value(index, value)?;
    if !manager.pins().is_field_pinned(&id) {
        manager.toggle_pin(&PinToggle::Field(id.clone()))?;
    }
    println!("Pinned {id} = {value}");
    Ok(())
}

fn handle_render(config: &Config, cmd: &RenderCommand) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&cmd.record)
        .with_context(|| format!("could not read {}", cmd.record.display()))?;
    let snapshot: RecordSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a record snapshot", cmd.record.display()))?;

    let storage = open_storage(config)?;
    let mut manager = open_session(config, &storage, !cmd.no_pin_mode)?;
    manager.set_current_fields(snapshot.current_fields);
    manager.set_form_values(snapshot.form_values);

    print_fields(manager.selected_fields(), cmd.format)
}

fn print_fields(fields: &[SelectedField], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(fields)?),
        OutputFormat::Plain => {
            if fields.is_empty() {
                println!("No fields.");
            }
            for field in fields {
                println!("{:>6}  {} = {}", field.value, field.label, field.field_value);
            }
        }
    }
    Ok(())
}

async fn handle_suggest(config: &Config, cmd: SuggestCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    let mut suggestions = config.suggestions.clone();
    if let Some(limit) = cmd.limit {
        suggestions.max_results = limit;
    }

    let service = SuggestionService::new(storage, suggestions);
    let values = service
        .suggest(&cmd.query, &FieldId::from(cmd.field_id))
        .await;
    for value in values {
        println!("{value}");
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "catalog_fields": stats.catalog_fields,
            "field_pins": stats.field_pins,
            "list_pin_members": stats.list_pin_members,
            "pinned_values": stats.pinned_values,
            "last_pinned_at": stats.last_pinned_at.map(|t| t.to_rfc3339()),
            "db_size_bytes": stats.db_size_bytes,
            "pin_mode": config.engine.pin_mode,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fieldpin status");
        println!("---------------");
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Catalog:       {} fields", stats.catalog_fields);
        println!("Field pins:    {}", stats.field_pins);
        match stats.list_pin_members {
            Some(n) => println!("List pin:      {n} fields"),
            None => println!("List pin:      none"),
        }
        println!("Values:        {}", stats.pinned_values);
        if let Some(at) = stats.last_pinned_at {
            println!("Last pinned:   {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("Pin mode:      {}", if config.engine.pin_mode { "on" } else { "off" });
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Engine]");
                println!("  Pin mode:           {}", config.engine.pin_mode);
                println!("  Unknown label:      {}", config.engine.unknown_label);
                println!();
                println!("[Suggestions]");
                println!(
                    "  Min query length:   {}",
                    config.suggestions.min_query_length
                );
                println!("  Max results:        {}", config.suggestions.max_results);
                println!("  Timeout (ms):       {}", config.suggestions.timeout_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
