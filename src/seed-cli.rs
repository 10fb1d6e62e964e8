//! A CLI tool for seeding a development database with sample users, an
//! election and a couple of ballots.
//!
//! Seeding is idempotent: anything that already exists is left alone.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use clap::{Arg, ArgAction, ArgMatches, Command};
use mongodb::Client as MongoClient;

use voting_backend::error::Error as BackendError;
use voting_backend::model::{
    common::{election::ElectionStatus, role::Role},
    db::{
        election::{Candidate, Election, NewElection},
        user::{NewUser, Profile, User},
    },
    mongodb::{ensure_indexes_exist, Id},
};
use voting_backend::storage::{MongoStorage, Store};
use voting_backend::voting::ledger;

const PROGRAM_NAME: &str = "seed-cli";

const ABOUT_TEXT: &str = "Seed a voting database with sample data.

Creates two voters, an admin and an active sample election with two
ballots. Existing users and elections are left untouched.

EXIT CODES:
     0: Seeding succeeded.
     1: Error.";

const DB_URI: &str = "DB_URI";
const DB_NAME: &str = "DB_NAME";
const ADMIN_EMAIL: &str = "ADMIN_EMAIL";
const ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";

const VOTER_PASSWORD: &str = "Voter@123";
const ELECTION_TITLE: &str = "Presidential Election 2025";

/// Storage operations may take a while against a cold database.
const STORAGE_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(DB_URI)
                .long("db-uri")
                .help("MongoDB connection string")
                .action(ArgAction::Set)
                .default_value("mongodb://127.0.0.1:27017"),
        )
        .arg(
            Arg::new(DB_NAME)
                .long("db-name")
                .help("Database to seed")
                .action(ArgAction::Set)
                .default_value("cloudbase_voting"),
        )
        .arg(
            Arg::new(ADMIN_EMAIL)
                .long("admin-email")
                .help("Email of the admin account to create")
                .action(ArgAction::Set)
                .default_value("admin@example.com"),
        )
        .arg(
            Arg::new(ADMIN_PASSWORD)
                .long("admin-password")
                .help("Password of the admin account to create.\nFor development only")
                .action(ArgAction::Set)
                .default_value("Admin@123"),
        )
}

/// Errors that this program may produce.
#[derive(Debug)]
enum Error {
    /// Could not reach the database.
    Connection(mongodb::error::Error),
    /// A backend operation failed.
    Backend(BackendError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "Failed to connect to database: {err}"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

/// Find a user by email, creating them if they don't exist.
async fn find_or_create_user(
    store: &Store,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, Error> {
    if let Some(user) = store.user_by_email(&email.to_lowercase()).await? {
        println!("User already exists: {}", user.email);
        return Ok(user);
    }
    let new_user = NewUser::new(name.to_string(), email, password, role, Profile::default())?;
    match store.insert_user(new_user).await? {
        Some(user) => {
            println!("Created {role} {}", user.email);
            Ok(user)
        }
        // Lost a race with another writer; theirs is as good as ours.
        None => store
            .user_by_email(&email.to_lowercase())
            .await?
            .ok_or_else(|| BackendError::not_found(format!("User {email}")).into()),
    }
}

/// The sample election, open from yesterday for a week.
fn sample_election(created_by: Id) -> NewElection {
    let now = Utc::now();
    let candidate = |name: &str, party: &str| Candidate {
        id: Id::new(),
        name: name.to_string(),
        party: party.to_string(),
    };
    NewElection {
        title: ELECTION_TITLE.to_string(),
        description: "National election for the next term".to_string(),
        starts_at: now - Duration::days(1),
        ends_at: now + Duration::days(7),
        status: ElectionStatus::Active,
        candidates: vec![
            candidate("Alice Johnson", "Blue Party"),
            candidate("Bob Smith", "Green Party"),
            candidate("Carlos Reyes", "Independent"),
        ],
        ballots: Vec::new(),
        created_by,
        created_at: now,
    }
}

async fn find_or_create_election(store: &Store, admin: &User) -> Result<Election, Error> {
    let existing = store
        .elections(None)
        .await?
        .into_iter()
        .find(|election| election.title == ELECTION_TITLE);
    match existing {
        Some(election) => {
            println!("Election already exists: {ELECTION_TITLE}");
            Ok(election)
        }
        None => {
            let election = store.insert_election(sample_election(admin.id)).await?;
            println!("Created election: {ELECTION_TITLE}");
            Ok(election)
        }
    }
}

async fn seed(args: &ArgMatches) -> Result<(), Error> {
    let db_uri = args.get_one::<String>(DB_URI).expect("Has default");
    let db_name = args.get_one::<String>(DB_NAME).expect("Has default");
    let admin_email = args.get_one::<String>(ADMIN_EMAIL).expect("Has default");
    let admin_password = args
        .get_one::<String>(ADMIN_PASSWORD)
        .expect("Has default");

    let client = MongoClient::with_uri_str(db_uri)
        .await
        .map_err(Error::Connection)?;
    let db = client.database(db_name);
    ensure_indexes_exist(&db).await.map_err(Error::Connection)?;
    let store: Store = Arc::new(MongoStorage::new(&db, STORAGE_TIMEOUT));

    let mut voters = Vec::new();
    for (name, email) in [
        ("Voter One", "voter1@example.com"),
        ("Voter Two", "voter2@example.com"),
    ] {
        voters.push(find_or_create_user(&store, name, email, VOTER_PASSWORD, Role::User).await?);
    }
    let admin = find_or_create_user(
        &store,
        "Administrator",
        admin_email,
        admin_password,
        Role::Admin,
    )
    .await?;

    let election = find_or_create_election(&store, &admin).await?;
    if !election.ballots.is_empty() {
        println!("Election already has votes, skipping vote seeding");
    } else if !election.status.accepts_votes() {
        println!(
            "Election is {}, skipping vote seeding",
            election.status
        );
    } else {
        for (voter, candidate) in voters.iter().zip(&election.candidates) {
            ledger::cast_vote(&store, election.id, voter.id, candidate.id, None).await?;
        }
        println!("Added sample votes to election");
    }

    println!();
    println!("Seeding complete.");
    println!("Voter accounts: voter1@example.com / {VOTER_PASSWORD}, voter2@example.com / {VOTER_PASSWORD}");
    println!("Admin account: {} / {admin_password}", admin.email);
    println!("These credentials are for development only.");
    Ok(())
}

fn run(args: &ArgMatches) -> u8 {
    let runtime = match rocket::tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start async runtime: {err}");
            return 1;
        }
    };
    match runtime.block_on(seed(args)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Seeding failed: {err}");
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
