use dev_portal::disclosure::{Provenance, SecretDisclosure};
use dev_portal::{Config, Portal};

const USAGE: &str = "\
Usage: dev-portal <command> [args]

Commands:
  login <email> <password>
  logout
  whoami
  apps
  countries
  products
  users
  pairs <client-id>
  rotate-secret <client-id> [reason]
  rotate-keys <client-id> [reason]
  approve <client-id> <record-id> <pin>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dev_portal=info".into());
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    let portal = Portal::connect(config).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |i: usize| args.get(i).map(|s| s.as_str());

    match arg(0) {
        Some("login") => {
            let (Some(email), Some(password)) = (arg(1), arg(2)) else {
                return usage();
            };
            match portal.login(email, password).await? {
                Some(user) => println!("Signed in as {} ({})", user.name, user.access_level),
                None => println!("Signed in."),
            }
        }
        Some("logout") => {
            portal.logout().await?;
            println!("Signed out.");
        }
        Some("whoami") => match portal.session().user() {
            Some(user) => println!("{} <{}> {}", user.name, user.email, user.access_level),
            None if portal.session().is_authenticated() => println!("Signed in (no profile)"),
            None => println!("Not signed in"),
        },
        Some("apps") => {
            for app in portal.list_applications().await? {
                println!(
                    "{:<38} {:<28} {:<4} {}",
                    app.client_id,
                    app.name,
                    app.environment.as_str(),
                    app.redirect_uri
                );
            }
        }
        Some("countries") => {
            for country in portal.list_countries().await? {
                println!(
                    "{:<4} {:<24} {} {} +{:<5} {:<4} {}",
                    country.id,
                    country.name,
                    country.alpha2_code,
                    country.alpha3_code,
                    country.calling_code,
                    country.currency,
                    country.status.as_str()
                );
            }
        }
        Some("products") => {
            for product in portal.list_products().await? {
                println!(
                    "{:<20} {:<20} {:<8} {}",
                    product.id,
                    product.name,
                    product.status.as_str(),
                    product.description
                );
            }
        }
        Some("users") => {
            for account in portal.list_user_accounts().await? {
                println!(
                    "{:<8} {:<28} {:<32} {} {}",
                    account.id,
                    account.name,
                    account.email,
                    account.access_level,
                    account.status.as_str()
                );
            }
        }
        Some("pairs") => {
            let Some(client_id) = arg(1) else {
                return usage();
            };
            for pair in portal.list_pairings(client_id).await? {
                println!(
                    "{:<8} {:<20} {:<4} {:<9} {}",
                    pair.record_id,
                    pair.product_name,
                    pair.country_alpha3,
                    pair.assignment_status,
                    pair.call_back_url
                );
            }
        }
        Some("rotate-secret") => {
            let Some(client_id) = arg(1) else {
                return usage();
            };
            let reason = arg(2).unwrap_or("Rotated from the command line");

            let mut dialog = SecretDisclosure::new();
            let provenance = portal.regenerate_secret(client_id, reason, &mut dialog).await?;
            print_disclosure(&dialog);
            if provenance == Provenance::Placeholder {
                println!("  (Rotation failed: this is a placeholder, not a working secret!)");
            }
            dialog.close();
        }
        Some("rotate-keys") => {
            let Some(client_id) = arg(1) else {
                return usage();
            };
            let reason = arg(2).unwrap_or("Rotated from the command line");

            let mut dialog = SecretDisclosure::new();
            portal.rotate_keys(client_id, reason, &mut dialog).await?;
            print_disclosure(&dialog);
            dialog.close();
        }
        Some("approve") => {
            let (Some(client_id), Some(record_id), Some(pin)) = (arg(1), arg(2), arg(3)) else {
                return usage();
            };
            let pairs = portal.list_pairings(client_id).await?;
            let Some(pair) = pairs.iter().find(|p| p.record_id == record_id) else {
                return Err(format!("No pairing {record_id} for {client_id}").into());
            };
            let status = portal.approve_pair(pair, pin).await?;
            println!("Pairing {record_id} is now {status}.");
        }
        _ => return usage(),
    }

    Ok(())
}

fn print_disclosure(dialog: &SecretDisclosure) {
    let Some(disclosure) = dialog.current() else {
        return;
    };
    println!("  Client ID: {}", disclosure.client_id);
    for field in disclosure.fields() {
        println!("  {}: {}", field.name, field.value().expose());
    }
    println!("  (Save this now: it won't be shown again!)");
}

fn usage() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("{USAGE}");
    std::process::exit(2);
}
