#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI over the mailbox operations

use clap::{Parser, Subcommand};
use mailbox_access::{Account, EmailMessage, MailboxClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailbox-cli")]
#[command(about = "List, read, move and search mail over IMAP")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the most recent emails of a folder
    List {
        #[arg(long, default_value = "INBOX")]
        folder: String,

        /// Maximum number of emails to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show a single email by UID
    Show {
        uid: u32,

        #[arg(long, default_value = "INBOX")]
        folder: String,
    },

    /// List all folders with their full paths
    Folders,

    /// Count unread emails in a folder
    Unread {
        #[arg(long, default_value = "INBOX")]
        folder: String,
    },

    /// Move an email to another folder, creating it if needed
    Move {
        uid: u32,

        #[arg(long, default_value = "INBOX")]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// Find emails sent from or to an address
    Search {
        address: String,

        /// Folders to search, in order (repeatable)
        #[arg(long = "folder", default_values = ["INBOX", "Sent"])]
        folders: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = MailboxClient::new(Account::from_env()?);

    match &args.command {
        Command::List { folder, limit } => {
            let emails = client.list_messages(folder, *limit).await?;
            print_emails(&args, &emails)?;
        }
        Command::Show { uid, folder } => match client.get_message(folder, *uid).await? {
            Some(email) if args.json => println!("{}", serde_json::to_string_pretty(&email)?),
            Some(email) => print_email_detail(&email),
            None => anyhow::bail!("No email with UID {uid} in {folder}"),
        },
        Command::Folders => {
            let folders = client.list_folders().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&folders)?);
            } else {
                for folder in &folders {
                    println!("{}", folder.path);
                }
            }
        }
        Command::Unread { folder } => {
            let count = client.get_unread_count(folder).await?;
            if args.json {
                println!("{}", serde_json::json!({ "folder": folder, "unread": count }));
            } else {
                println!("{count}");
            }
        }
        Command::Move { uid, from, to } => {
            let outcome = client.move_message(from, *uid, to).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.message);
                for warning in &outcome.warnings {
                    eprintln!("warning: {warning}");
                }
            }
        }
        Command::Search { address, folders } => {
            let emails = client.search_by_address(address, folders).await?;
            print_emails(&args, &emails)?;
        }
    }

    Ok(())
}

fn print_emails(args: &Args, emails: &[EmailMessage]) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(emails)?);
    } else {
        print_email_table(emails);
    }
    Ok(())
}

fn print_email_table(emails: &[EmailMessage]) {
    if emails.is_empty() {
        println!("No emails found.");
        return;
    }

    let header = format!("{:<8} {:<20} {:<30} {}", "ID", "Date", "From", "Subject");
    println!("{header}");
    println!("{}", "-".repeat(100));

    for email in emails {
        let date = email
            .date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{:<8} {:<20} {:<30} {}",
            email.id,
            date,
            truncate(&email.from.address, 28),
            truncate(&email.subject, 40),
        );
    }

    println!("\n{} email(s)", emails.len());
}

fn print_email_detail(email: &EmailMessage) {
    println!("ID:      {}", email.id);
    if let Some(date) = email.date {
        println!("Date:    {}", date.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("From:    {}", display_address(&email.from));
    println!(
        "To:      {}",
        email
            .to
            .iter()
            .map(display_address)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Subject: {}", email.subject);
    println!("Read:    {}", if email.is_read { "yes" } else { "no" });

    println!("\n--- Body ---\n");
    println!(
        "{}",
        email
            .body_text
            .as_deref()
            .or(email.body_html.as_deref())
            .unwrap_or("")
    );

    if email.has_attachments {
        println!("\n--- Attachments ---");
        for a in &email.attachments {
            println!("  {} ({}, {} bytes)", a.filename, a.content_type, a.size);
        }
    }
}

fn display_address(addr: &mailbox_access::EmailAddress) -> String {
    if addr.name.is_empty() {
        addr.address.clone()
    } else {
        format!("{} <{}>", addr.name, addr.address)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
