use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use bid_ledger::{MissingBidLedger, WalletAddress};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{
    complete_onboarding, config::load_settings, create_and_track_shipment, ActorKind,
    BidDirectory, MarketplaceClient, OnboardingFlowController, SessionState, ShipmentEndpoints,
    ShipmentStatusStore,
};
use shared::{
    domain::{Role, StatusFilter, TransportMode},
    protocol::{RegisterRequest, ShipmentDraft},
};
use storage::SessionStorage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Freight marketplace client")]
struct Cli {
    /// Overrides the configured backend URL.
    #[arg(long)]
    backend_url: Option<String>,
    /// Overrides the configured session database.
    #[arg(long)]
    session_db: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        country: String,
        #[arg(long, value_enum)]
        role: RoleArg,
    },
    Logout,
    Whoami,
    /// Lists the signed-in shipper's shipments for one dashboard tab.
    Shipments {
        #[arg(long, default_value = "all")]
        status: String,
    },
    CreateShipment {
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        load: f64,
    },
    Onboard(OnboardArgs),
    LinkWallet {
        #[arg(long)]
        address: String,
        #[arg(long)]
        chain_id: Option<u64>,
    },
    /// Lists bids recorded on the ledger for a shipper wallet.
    Bids {
        #[arg(long)]
        address: String,
    },
}

#[derive(Args, Debug)]
struct OnboardArgs {
    #[arg(long, value_enum)]
    kind: KindArg,
    /// Individual accounts: which side of the marketplace.
    #[arg(long, value_enum)]
    role: Option<RoleArg>,
    #[arg(long)]
    org_name: Option<String>,
    /// Organization accounts: declared marketplace side.
    #[arg(long, value_enum)]
    org_type: Option<RoleArg>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    industry: Option<String>,
    /// Repeatable: air, water, railway, road.
    #[arg(long = "mode")]
    modes: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Shipper,
    Carrier,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Shipper => Role::Shipper,
            RoleArg::Carrier => Role::Carrier,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Individual,
    Organization,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("freightctl=info,client_core=info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    if let Some(db) = cli.session_db {
        settings.session_database_url = db;
    }
    settings
        .backend_url()
        .with_context(|| format!("invalid backend url '{}'", settings.backend_url))?;
    debug!(?settings, "loaded settings");

    let storage = SessionStorage::new(&settings.session_database_url).await?;
    let session = SessionState::new(Arc::new(storage));
    session.restore().await?;
    let client = MarketplaceClient::new(settings.backend_url.clone(), session);

    match cli.command {
        Command::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            println!("Signed in as {} <{}>", user.display_name(), user.email);
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            country,
            role,
        } => {
            let user = client
                .register(&RegisterRequest {
                    first_name,
                    last_name,
                    email,
                    password,
                    country,
                    role: role.into(),
                })
                .await?;
            println!("Registered {}; run `onboard` to complete your profile", user.email);
        }
        Command::Logout => {
            client.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match client.session().current().await {
            Some(session) => println!(
                "{} <{}> role={}",
                session.user.display_name(),
                session.user.email,
                session.user.role.map(Role::as_str).unwrap_or("unset")
            ),
            None => println!("Not signed in"),
        },
        Command::Shipments { status } => {
            let filter = StatusFilter::parse(&status)
                .ok_or_else(|| anyhow!("unknown status tab '{status}'"))?;
            show_shipments(&client, &settings.backend_url, filter).await?;
        }
        Command::CreateShipment {
            origin,
            destination,
            load,
        } => {
            let store = ShipmentStatusStore::new(Arc::new(client.shipment_source().await));
            let draft = ShipmentDraft {
                origin_code: origin,
                destination_code: destination,
                cargo_load: load,
            };
            let shipment = create_and_track_shipment(&client, &store, &draft).await?;
            println!(
                "Created shipment {} ({})",
                shipment.id.map(|id| id.0).unwrap_or_default(),
                shipment.status.as_str()
            );
        }
        Command::Onboard(args) => {
            let flow = run_onboarding(args)?;
            let route = complete_onboarding(&client, &flow).await?;
            println!("Profile complete; continue at {}", route.path());
        }
        Command::LinkWallet { address, chain_id } => {
            let address = WalletAddress::parse(&address)?;
            let chain_id = chain_id.unwrap_or(settings.chain_id);
            client.link_wallet(&address, chain_id).await?;
            println!("Linked wallet {address} on chain {chain_id}");
        }
        Command::Bids { address } => {
            // No contract binding ships with this client yet.
            let directory = BidDirectory::new(Arc::new(MissingBidLedger));
            let bids = directory.bids_for_shipper(&address).await?;
            for bid in bids {
                println!(
                    "#{:<6} {:<24} {:>12} {} -> {}",
                    bid.id.0,
                    bid.params.shipment_ref,
                    bid.params.price,
                    bid.params.origin.label,
                    bid.params.destination.label,
                );
            }
        }
    }

    Ok(())
}

async fn show_shipments(
    client: &MarketplaceClient,
    backend_url: &str,
    filter: StatusFilter,
) -> Result<()> {
    let session = client
        .session()
        .current()
        .await
        .ok_or_else(|| anyhow!("sign in first"))?;
    let shipper_id = session
        .user
        .shipper_id
        .ok_or_else(|| anyhow!("the signed-in account has no shipper profile"))?;
    let endpoints = ShipmentEndpoints::for_shipper(backend_url, shipper_id)?;
    let store = ShipmentStatusStore::new(Arc::new(client.shipment_source().await));

    store.fetch_shipments(filter, &endpoints.url(filter)).await;
    let snapshot = store.snapshot().await;
    if let Some(error) = snapshot.error {
        bail!(error);
    }

    println!("{} shipments ({})", snapshot.active_status, snapshot.shipments.len());
    for shipment in snapshot.shipments {
        println!(
            "{:<26} {:<10} {:>8} -> {:<8} {:>8.2} {:<12} eta {}",
            shipment.id.map(|id| id.0).unwrap_or_default(),
            shipment.status.as_str(),
            shipment.origin.postal_code.unwrap_or_default(),
            shipment.destination.postal_code.unwrap_or_default(),
            shipment.cargo_load,
            shipment.cargo_type.as_str(),
            shipment.estimated_delivery_date.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

/// Drives the wizard from flags exactly as the interactive screens would.
fn run_onboarding(args: OnboardArgs) -> Result<OnboardingFlowController> {
    let mut flow = OnboardingFlowController::new();
    match args.kind {
        KindArg::Individual => flow.choose_actor_kind(ActorKind::Individual)?,
        KindArg::Organization => flow.choose_actor_kind(ActorKind::Organization)?,
    }
    flow.advance()?;

    match args.kind {
        KindArg::Individual => {
            let role = args
                .role
                .ok_or_else(|| anyhow!("--role is required for individual accounts"))?;
            flow.choose_sub_role(role.into())?;
        }
        KindArg::Organization => {
            let details = flow.organization_mut()?;
            details.name = args.org_name.unwrap_or_default();
            details.organization_type = args.org_type.map(Role::from);
            details.address = args.address.unwrap_or_default();
            details.industry = args.industry.unwrap_or_default();
            for raw in &args.modes {
                let mode = TransportMode::parse(raw)
                    .ok_or_else(|| anyhow!("unknown transport mode '{raw}'"))?;
                if !details.modes.contains(&mode) {
                    details.modes.push(mode);
                }
            }
        }
    }

    flow.advance()
        .context("organization name, type and address are required, plus an industry for shippers or a transport mode for carriers")?;
    Ok(flow)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
