use std::{error::Error, io::Write, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Actor, Backup, Engine, InvestorNew, MoneyCents, Role, User};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

/// Identity recorded in the audit log for CLI operations.
const CLI_ACTOR: &str = "henhouse_admin";

#[derive(Parser, Debug)]
#[command(name = "henhouse_admin")]
#[command(about = "Admin utilities for Henhouse (bootstrap users/investors, backups)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./henhouse.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(UserCmd),
    Investor(InvestorCmd),
    /// Write every collection to a JSON backup.
    Export(ExportArgs),
    /// Replace investors, users, transactions and eggs with a JSON backup.
    Import(ImportArgs),
    /// Print fund balance and per-investor figures.
    Summary,
}

#[derive(Args, Debug)]
struct UserCmd {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Investor,
    Admin,
    SuperAdmin,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Investor => Role::Investor,
            RoleArg::Admin => Role::Admin,
            RoleArg::SuperAdmin => Role::SuperAdmin,
        }
    }
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long, value_enum, default_value = "investor")]
    role: RoleArg,
    /// Investor this login acts as.
    #[arg(long)]
    investor_id: Option<Uuid>,
}

#[derive(Args, Debug)]
struct InvestorCmd {
    #[command(subcommand)]
    command: InvestorCommand,
}

#[derive(Subcommand, Debug)]
enum InvestorCommand {
    Create(InvestorCreateArgs),
}

#[derive(Args, Debug)]
struct InvestorCreateArgs {
    #[arg(long)]
    name: String,
    /// Initial capital, e.g. `1500` or `1500,50`.
    #[arg(long, value_parser = parse_money)]
    capital: MoneyCents,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    gender: Option<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output file; stdout when absent.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(long)]
    input: PathBuf,
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

fn parse_money(raw: &str) -> Result<MoneyCents, String> {
    raw.parse::<MoneyCents>().map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

fn confirm(question: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn print_summary(engine: &Engine) -> Result<(), Box<dyn Error + Send + Sync>> {
    let snapshot = engine.snapshot().await?;
    println!("fund balance:       {}", snapshot.fund_balance);
    println!("initial capital:    {}", snapshot.total_initial_capital);
    println!("expenses:           {}", snapshot.total_expenses);
    println!("contributions:      {}", snapshot.total_contributions);
    println!(
        "settlements in/out: {} / {}",
        snapshot.total_settlements_in, snapshot.total_settlements_out
    );
    println!("eggs produced:      {}", snapshot.total_eggs);
    println!();
    for investor in &snapshot.investors {
        println!(
            "{:<24} {:>6.2}%  balance {:>12}",
            investor.name,
            investor.share_percent,
            investor.balance.to_string()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let actor = Actor::new(CLI_ACTOR, Role::SuperAdmin);

    match cli.command {
        Command::User(UserCmd {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let user = User {
                email: args.email.clone(),
                password,
                role: args.role.into(),
                investor_id: args.investor_id,
            };
            if let Err(err) = engine.create_user(&actor, user).await {
                eprintln!("{err}");
                std::process::exit(1);
            }

            println!("created user: {}", args.email);
        }
        Command::Investor(InvestorCmd {
            command: InvestorCommand::Create(args),
        }) => {
            let mut cmd = InvestorNew::new(&args.name, args.capital);
            cmd.email = args.email;
            cmd.gender = args.gender;
            let investor_id = engine.create_investor(&actor, cmd).await?;
            println!("created investor: {} ({investor_id})", args.name);
        }
        Command::Export(args) => {
            let backup = engine.export_backup(&actor).await?;
            let json = backup.to_json()?;
            match args.output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("backup written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import(args) => {
            let raw = std::fs::read_to_string(&args.input)?;
            let backup = Backup::from_json(&raw)?;
            if !args.yes
                && !confirm(&format!(
                    "Replace investors, users, transactions and eggs with {} ({} transactions)?",
                    args.input.display(),
                    backup.transactions.len()
                ))?
            {
                eprintln!("aborted");
                std::process::exit(1);
            }
            engine.import_backup(&actor, backup).await?;
            println!("backup imported");
        }
        Command::Summary => print_summary(&engine).await?,
    }

    Ok(())
}
