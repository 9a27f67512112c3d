//! Tourbook command-line client
//!
//! Restores the persisted session, loads the account's data through the
//! client stores and prints a summary.
//!
//! # Usage
//!
//! ```bash
//! TOURBOOK_API_BASE_URL=http://localhost:8082 \
//! TOURBOOK_TOKEN_FILE=~/.tourbook/token \
//! cargo run --bin tourbook -- [summary|wishlist|tours|admin]
//! ```
//!
//! Without a stored token, `TOURBOOK_EMAIL` and `TOURBOOK_PASSWORD` are used
//! to sign in.

use anyhow::{Context, bail};
use std::sync::Arc;
use tourbook_client::{ClientConfig, Credentials, HttpBackend, Session, SessionEvent};
use tourbook_core::environment::{ApiEnvironment, Clock, SystemClock};
use tourbook_runtime::StoreConfig;
use tourbook_stores::{DEFAULT_REQUEST_TIMEOUT, TourbookApp, selectors};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Summary,
    Wishlist,
    Tours,
    Admin,
}

impl Command {
    fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        match arg.unwrap_or("summary") {
            "summary" => Ok(Self::Summary),
            "wishlist" => Ok(Self::Wishlist),
            "tours" => Ok(Self::Tours),
            "admin" => Ok(Self::Admin),
            other => bail!("unknown command `{other}` (expected summary, wishlist, tours or admin)"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourbook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = Command::parse(std::env::args().nth(1).as_deref())?;

    let config = ClientConfig::from_env();
    config.validate().context("invalid client configuration")?;

    let session = Arc::new(Session::new(config.token_file.clone()));
    let restored = session.load().await.context("reading the stored token")?;
    let backend = HttpBackend::new(&config, Arc::clone(&session))?;
    tracing::info!(base_url = backend.base_url(), restored, "Client ready");

    if !session.is_authenticated() {
        sign_in(&backend).await?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let env = ApiEnvironment::new(Arc::new(backend), Arc::clone(&clock));
    let app = TourbookApp::with_config(
        env,
        StoreConfig::default().with_broadcast_capacity(config.broadcast_capacity),
        DEFAULT_REQUEST_TIMEOUT,
    );
    watch_session(&session, app.clone());

    match command {
        Command::Summary => summary(&app, clock.as_ref()).await?,
        Command::Wishlist => wishlist(&app).await?,
        Command::Tours => tours(&app).await?,
        Command::Admin => admin(&app).await?,
    }

    app.store().shutdown_default().await?;
    Ok(())
}

async fn sign_in(backend: &HttpBackend) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("TOURBOOK_EMAIL"),
        std::env::var("TOURBOOK_PASSWORD"),
    ) else {
        bail!("not signed in: set TOURBOOK_EMAIL and TOURBOOK_PASSWORD or provide a token file");
    };
    let user = backend
        .login(&Credentials { email, password })
        .await
        .context("signing in")?;
    if let Some(user) = user {
        tracing::info!(user = %user.full_name(), "Signed in");
    }
    Ok(())
}

/// Clears client state when the backend ends the session
fn watch_session(session: &Session, app: TourbookApp) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while events.changed().await.is_ok() {
            let event = *events.borrow_and_update();
            if event == SessionEvent::LoginRequired {
                tracing::warn!("Session expired, sign in again");
                if let Err(error) = app.sign_out().await {
                    tracing::debug!(%error, "Could not clear client state");
                }
            }
        }
    });
}

async fn summary(app: &TourbookApp, clock: &dyn Clock) -> anyhow::Result<()> {
    let me = app.fetch_me().await.context("loading the profile")?;
    let (bookings, wishlist) = tokio::join!(app.fetch_my_bookings(), app.fetch_wishlist());
    bookings.context("loading bookings")?;
    wishlist.context("loading the wishlist")?;

    let state = app.snapshot().await;
    let mine = &state.bookings.mine;
    println!("{} <{}>", me.full_name(), me.email);
    println!("  bookings:        {}", mine.len());
    println!("  completed trips: {}", selectors::completed_trips(mine));
    println!("  destinations:    {}", selectors::destinations_visited(mine));
    println!("  total paid:      {}", selectors::total_paid(mine));
    println!("  refunded:        {}", selectors::total_refunded(mine));
    println!("  wishlist:        {}", selectors::wishlist_count(&state.wishlist));

    let upcoming = selectors::upcoming_confirmed(mine, clock.now());
    if !upcoming.is_empty() {
        println!("Upcoming trips:");
        for booking in upcoming {
            println!(
                "  {} {}",
                booking
                    .travel_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                booking.tour_title.as_deref().unwrap_or(selectors::UNKNOWN_TOUR),
            );
        }
    }
    Ok(())
}

async fn wishlist(app: &TourbookApp) -> anyhow::Result<()> {
    let tours = app.fetch_wishlist().await.context("loading the wishlist")?;
    if tours.is_empty() {
        println!("Your wishlist is empty");
    }
    for tour in tours {
        println!("{:>6}  {:<40} {:>10}  {}", tour.id, tour.title, tour.price, tour.destination);
    }
    Ok(())
}

async fn tours(app: &TourbookApp) -> anyhow::Result<()> {
    app.fetch_tours().await.context("loading tours")?;
    app.fetch_wishlist().await.context("loading the wishlist")?;
    let search = std::env::args().nth(2).unwrap_or_default();

    let rows: Vec<String> = app
        .state(|s| {
            selectors::filtered_tours(&s.tours, &search)
                .into_iter()
                .map(|tour| {
                    let mark = if selectors::is_in_wishlist(&s.wishlist, &tour.id) {
                        '*'
                    } else {
                        ' '
                    };
                    format!("{mark} {:>6}  {:<40} {:>10}  {}d", tour.id, tour.title, tour.price, tour.duration)
                })
                .collect()
        })
        .await;
    for row in rows {
        println!("{row}");
    }
    Ok(())
}

async fn admin(app: &TourbookApp) -> anyhow::Result<()> {
    let (tours, bookings, users, stats) = tokio::join!(
        app.fetch_tours(),
        app.fetch_all_bookings(),
        app.fetch_users(),
        app.fetch_booking_stats(),
    );
    tours.context("loading tours")?;
    bookings.context("loading bookings")?;
    users.context("loading users")?;
    stats.context("loading booking stats")?;

    let state = app.snapshot().await;
    let dashboard = selectors::dashboard_stats(&state);
    println!("Active packages:  {}", dashboard.active_tours);
    println!("Customers:        {}", dashboard.customers);
    println!("Bookings:         {} ({} pending)", dashboard.total_bookings, dashboard.pending_bookings);
    println!("Confirmed:        {}", selectors::confirmed_count(&state.bookings));
    println!("Revenue:          {}", dashboard.total_revenue);

    println!("Popular tours:");
    for entry in selectors::popular_tours(&state.tours.catalogue.items, state.bookings.all(), 5) {
        println!("  {:<40} {}", entry.tour.title, entry.bookings);
    }
    println!("Recent bookings:");
    for booking in selectors::recent_bookings(state.bookings.all(), 5) {
        println!(
            "  {:>6}  {:<40} {:>10}  {}",
            booking.id,
            booking.tour_title.as_deref().unwrap_or(selectors::UNKNOWN_TOUR),
            booking.total_amount,
            booking.status
        );
    }
    Ok(())
}
