//! Command-line front end for the contact store.
//!
//! # Responsibility
//! - Drive the same core use-cases the mobile UI calls.
//! - Keep output line-oriented for scripting and quick sanity checks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use contactor_core::{
    default_log_level, init_logging, plan_import, AddressBook, Admission, ContactId,
    ContactListCache, ContactPatch, ContactService, DeleteOutcome, FileContactRepository,
    ImportOutcome, ImportService, JsonFileAddressBook, NewContact, StoreConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "contactor", version, about = "Manage contacts stored as JSON files")]
struct Cli {
    /// Contacts directory. Defaults to $CONTACTOR_CONTACTS_DIR or ./contacts.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Log level (trace|debug|info|warn|error). Requires --log-dir.
    #[arg(long, global = true, requires = "log_dir")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List contacts sorted by name.
    List {
        /// Case-insensitive name substring.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show one contact.
    Show { id: String },
    /// Create a contact.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        photo: Option<String>,
    },
    /// Edit a contact. Omitted fields keep their value.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, conflicts_with = "clear_photo")]
        photo: Option<String>,
        #[arg(long)]
        clear_photo: bool,
    },
    /// Delete a contact. Deleting an unknown id is not an error.
    Delete { id: String },
    /// Import contacts from a JSON address-book export.
    Import {
        file: PathBuf,
        /// Print the merge plan without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let log_dir = log_dir
            .to_str()
            .context("log directory must be valid UTF-8")?;
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let config = match &cli.dir {
        Some(dir) => StoreConfig::new(dir),
        None => StoreConfig::from_env(std::env::current_dir()?),
    };
    let repo = Arc::new(
        FileContactRepository::open(config)
            .await
            .context("failed to open contact store")?,
    );
    let service = ContactService::new(repo.clone());

    match cli.command {
        Command::List { filter } => {
            let cache = ContactListCache::new(repo);
            let summary = cache.refresh().await?;
            for contact in cache.filter(filter.as_deref().unwrap_or_default()) {
                println!(
                    "{}\t{}\t{}",
                    contact.id, contact.name, contact.phone_number
                );
            }
            for malformed in &summary.malformed {
                eprintln!("warning: {malformed}");
            }
        }
        Command::Show { id } => {
            let id = parse_id(&id)?;
            let Some(contact) = service.get_contact(&id).await? else {
                bail!("contact not found: {id}");
            };
            println!("id:    {}", contact.id);
            println!("name:  {}", contact.name);
            println!("phone: {}", contact.phone_number);
            println!("photo: {}", contact.photo.as_deref().unwrap_or("-"));
        }
        Command::Add { name, phone, photo } => {
            let contact = service
                .create_contact(NewContact {
                    name,
                    phone_number: phone,
                    photo,
                })
                .await?;
            println!("{}", contact.id);
        }
        Command::Edit {
            id,
            name,
            phone,
            photo,
            clear_photo,
        } => {
            let patch = ContactPatch {
                name,
                phone_number: phone,
                photo: if clear_photo { Some(None) } else { photo.map(Some) },
            };
            if patch.is_empty() {
                bail!("nothing to edit; pass --name, --phone, --photo or --clear-photo");
            }
            let contact = service.update_contact(&parse_id(&id)?, patch).await?;
            println!("{}\t{}\t{}", contact.id, contact.name, contact.phone_number);
        }
        Command::Delete { id } => match service.delete_contact(&parse_id(&id)?).await? {
            DeleteOutcome::Removed => println!("deleted {id}"),
            DeleteOutcome::AlreadyAbsent => println!("{id} was already absent"),
        },
        Command::Import { file, dry_run } => {
            let book = JsonFileAddressBook::new(file);
            if dry_run {
                print_plan(&service, &book).await?;
            } else {
                let report = ImportService::new(repo).import_from(&book).await?;
                for outcome in &report.outcomes {
                    match outcome {
                        ImportOutcome::Imported(contact) => println!("imported\t{}", contact.id),
                        ImportOutcome::Skipped { source_id, reason } => {
                            println!("skipped\t{source_id}\t{}", reason.as_str())
                        }
                        ImportOutcome::Failed { source_id, error } => {
                            println!("failed\t{source_id}\t{error}")
                        }
                    }
                }
                println!(
                    "imported={} skipped={} failed={}",
                    report.imported_count(),
                    report.skipped_count(),
                    report.failed_count()
                );
            }
        }
    }

    Ok(())
}

async fn print_plan(
    service: &ContactService<Arc<FileContactRepository>>,
    book: &JsonFileAddressBook,
) -> Result<()> {
    let entries = book.list_contacts().await?;
    let existing = service.list_contacts().await?;
    let plan = plan_import(&existing.contacts, &entries);
    for (entry, admission) in entries.iter().zip(plan) {
        match admission {
            Admission::Accept(contact) => println!("would import\t{}", contact.id),
            Admission::Skip(reason) => {
                println!("would skip\t{}\t{}", entry.source_id, reason.as_str())
            }
            Admission::Reject(err) => println!("would fail\t{}\t{err}", entry.source_id),
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<ContactId> {
    ContactId::parse(raw.trim()).with_context(|| format!("invalid contact id `{raw}`"))
}
