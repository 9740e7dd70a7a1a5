/*
[INPUT]:  EVM private key (CONTRIB_PRIVATE_KEY) and rewards API endpoint
[OUTPUT]: Authenticated session and contributor profile
[POS]:    Examples - authentication flow demonstration
[UPDATE]: When auth flow changes
*/

use std::sync::Arc;

use contrib_auth::*;

/// Example: Authentication flow
///
/// 1. Create HTTP client and in-memory session store
/// 2. Sign in with a local EVM key
/// 3. Call an authenticated endpoint
/// 4. Log out
#[tokio::main]
async fn main() {
    println!("=== Contribution Rewards Authentication Example ===\n");

    let private_key = match std::env::var("CONTRIB_PRIVATE_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Set CONTRIB_PRIVATE_KEY to a hex EVM private key");
            return;
        }
    };
    let signer = match EvmWalletSigner::new(&private_key) {
        Ok(signer) => signer,
        Err(e) => {
            eprintln!("Failed to load signer: {}", e);
            return;
        }
    };
    let address = signer.address().to_string();
    println!("✓ Wallet loaded: {}", address);

    let client = match ContribClient::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    let auth = match SessionAuthenticator::init(
        Arc::new(client.clone()),
        Arc::new(MemorySessionStore::new()),
        AuthConfig::default(),
    ) {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("Failed to initialize authenticator: {}", e);
            return;
        }
    };

    match auth.authenticate(&address, Arc::new(signer)).await {
        Ok(session) => println!("✓ Signed in as {}", session.wallet_address),
        Err(e) => {
            eprintln!("Sign-in failed: {}", e);
            return;
        }
    }

    let authorized = AuthorizedClient::new(client, auth.clone());
    match authorized.get_profile().await {
        Ok(profile) => println!(
            "✓ {} points, {} tokens",
            profile.total_points, profile.token_balance
        ),
        Err(e) => eprintln!("Profile request failed: {}", e),
    }

    auth.logout();
    println!("\n✓ Authentication example complete");
}
