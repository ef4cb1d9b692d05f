use std::{collections::HashMap, fmt, fs::File, net::SocketAddr};

use anyhow::Context;
use chrono::NaiveDate;
use cucumber::{given, then, when, World as _};
use roadtrip::{
    auth::{self, RegisterInput},
    config::{AppConfig, DEFAULT_PLACES_BASE_URL},
    db::init_pool,
    models::{
        share::{ShareInput, TripShare},
        stop::{Stop, StopInput},
        trip::{Trip, TripInput},
        user::User,
    },
    ordering::StopOrder,
    services::places::PlacesClient,
    state::AppState,
};
use tempfile::TempDir;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, User>,
    owner: Option<User>,
    trip: Option<Trip>,
    share_error: Option<String>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn owner(&self) -> &User {
        self.owner.as_ref().expect("a user must be registered first")
    }

    fn trip(&self) -> &Trip {
        self.trip.as_ref().expect("a trip must be created first")
    }

    async fn refresh_trip(&mut self) {
        let id = self.trip().id;
        let trip = Trip::fetch(&self.app_state().db, id)
            .await
            .expect("fetch trip")
            .expect("trip exists");
        self.trip = Some(trip);
    }

    async fn stops(&self) -> Vec<Stop> {
        Stop::list_for_trip(&self.app_state().db, self.trip().id)
            .await
            .expect("list stops")
    }

    async fn stop_by_name(&self, name: &str) -> Stop {
        self.stops()
            .await
            .into_iter()
            .find(|stop| stop.name == name)
            .unwrap_or_else(|| panic!("no stop named {name}"))
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            places_api_key: None,
            places_base_url: DEFAULT_PLACES_BASE_URL.into(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let places = PlacesClient::new(&config)?;
        let app = AppState::new(config, db, places);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.owner = None;
    world.trip = None;
    world.share_error = None;
}

#[given(
    regex = r#"^a registered user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[when(
    regex = r#"^I register a user "([^"]+)" with email "([^"]+)" and password "([^"]+)"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[then(regex = r#"^I can authenticate as "([^"]+)" using password "([^"]+)"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, email: String, password: String) {
    let authed = auth::authenticate_user(&world.app_state().db, &email, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.email, email);
}

#[when(regex = r#"^I set the preference "([^"]+)" to "([^"]+)"$"#)]
async fn when_set_preference(world: &mut AppWorld, key: String, value: String) {
    let mut patch = serde_json::Map::new();
    patch.insert(key, serde_json::Value::String(value));
    User::merge_preferences(&world.app_state().db, world.owner().id, patch)
        .await
        .expect("merge preferences");
}

#[then(regex = r#"^the preference "([^"]+)" is "([^"]+)"$"#)]
async fn then_preference_is(world: &mut AppWorld, key: String, expected: String) {
    let user = User::find_by_id(&world.app_state().db, world.owner().id)
        .await
        .expect("find user")
        .expect("user exists");
    let preferences = user.preferences_map();
    assert_eq!(
        preferences.get(&key),
        Some(&serde_json::Value::String(expected))
    );
}

#[when(regex = r#"^I create a trip "([^"]+)" from (\S+) to (\S+)$"#)]
async fn when_create_trip(world: &mut AppWorld, name: String, start: String, end: String) {
    let input = TripInput {
        name,
        description: String::new(),
        route_type: "fastest".into(),
        start_date: Some(start.parse::<NaiveDate>().expect("start date")),
        end_date: Some(end.parse::<NaiveDate>().expect("end date")),
        is_public: false,
        fuel_efficiency: 25.0,
        fuel_price_per_gallon: 3.5,
    };
    let trip = Trip::insert(&world.app_state().db, world.owner().id, &input)
        .await
        .expect("create trip");
    world.trip = Some(trip);
}

#[then(regex = r"^the trip duration is (\d+) days$")]
async fn then_trip_duration(world: &mut AppWorld, expected: i64) {
    assert_eq!(world.trip().duration_days(), Some(expected));
}

#[when(regex = r#"^I add a stop "([^"]+)" at (-?[\d.]+), (-?[\d.]+)$"#)]
async fn when_add_stop(world: &mut AppWorld, name: String, latitude: f64, longitude: f64) {
    let input = StopInput {
        name,
        address: String::new(),
        latitude,
        longitude,
        place_id: None,
        stop_type: "waypoint".into(),
        order: None,
        arrival_time: None,
        departure_time: None,
        duration_minutes: None,
        notes: None,
        estimated_cost: None,
    };
    Stop::insert(&world.app_state().db, world.trip().id, &input)
        .await
        .expect("insert stop");
}

#[when(regex = r#"^I delete the stop "([^"]+)"$"#)]
async fn when_delete_stop(world: &mut AppWorld, name: String) {
    let stop = world.stop_by_name(&name).await;
    Stop::delete(&world.app_state().db, world.trip().id, stop.id)
        .await
        .expect("delete stop");
}

#[then(regex = r"^the trip has (\d+) stops?$")]
async fn then_trip_has_stops(world: &mut AppWorld, expected: i64) {
    let count = Trip::stops_count(&world.app_state().db, world.trip().id)
        .await
        .expect("count stops");
    assert_eq!(count, expected);
}

#[then(regex = r#"^the stops appear in the order "([^"]+)"$"#)]
async fn then_stop_order(world: &mut AppWorld, expected: String) {
    let names: Vec<String> = world
        .stops()
        .await
        .into_iter()
        .map(|stop| stop.name)
        .collect();
    let expected: Vec<String> = expected.split(", ").map(str::to_string).collect();
    assert_eq!(names, expected);
}

#[when(regex = r#"^I swap the orders of "([^"]+)" and "([^"]+)"$"#)]
async fn when_swap_orders(world: &mut AppWorld, first: String, second: String) {
    let a = world.stop_by_name(&first).await;
    let b = world.stop_by_name(&second).await;
    let orders = vec![
        StopOrder {
            id: a.id,
            order: b.order,
        },
        StopOrder {
            id: b.id,
            order: a.order,
        },
    ];
    Stop::apply_orders(&world.app_state().db, world.trip().id, &orders)
        .await
        .expect("apply orders");
}

#[when("I recalculate the trip statistics")]
async fn when_recalculate(world: &mut AppWorld) {
    let state = world.app_state();
    Trip::recalculate_statistics(&state.db, &state.routes, world.trip().id)
        .await
        .expect("recalculate statistics");
    world.refresh_trip().await;
}

#[then(regex = r"^the trip totals are ([\d.]+) miles and ([\d.]+) hours$")]
async fn then_trip_totals(world: &mut AppWorld, distance: f64, time: f64) {
    let trip = world.trip();
    assert!((trip.total_distance - distance).abs() < 1e-9);
    assert!((trip.total_time - time).abs() < 1e-9);
}

#[then(regex = r"^the estimated fuel cost is ([\d.]+)$")]
async fn then_fuel_cost(world: &mut AppWorld, expected: f64) {
    assert!((world.trip().estimated_fuel_cost - expected).abs() < 1e-9);
}

#[then(regex = r"^the last stop has no travel leg$")]
async fn then_last_stop_no_leg(world: &mut AppWorld) {
    let stops = world.stops().await;
    let last = stops.last().expect("at least one stop");
    assert!(last.travel_time_to_next.is_none());
    assert!(last.travel_distance_to_next.is_none());
    for stop in &stops[..stops.len() - 1] {
        assert!(stop.travel_distance_to_next.is_some());
    }
}

#[when(regex = r#"^I share the trip with "([^"]+)" at level "([^"]+)"$"#)]
async fn when_share_trip(world: &mut AppWorld, email: String, level: String) {
    let input = ShareInput {
        shared_with_email: email.clone(),
        permission_level: level,
        message: None,
    };
    let result = TripShare::create(
        &world.app_state().db,
        world.trip().id,
        &email,
        world.owner().id,
        &input,
    )
    .await;
    world.share_error = result.err().map(|err| err.to_string());
}

#[then(regex = r#"^the trip is shared with "([^"]+)"$"#)]
async fn then_trip_shared(world: &mut AppWorld, email: String) {
    assert_eq!(world.share_error, None);
    let recipient = world.users.get(&email).expect("recipient registered");
    let share = TripShare::active_for(&world.app_state().db, world.trip().id, recipient.id)
        .await
        .expect("query share");
    assert!(share.is_some());
}

#[then(regex = r#"^sharing fails with "([^"]+)"$"#)]
async fn then_sharing_fails(world: &mut AppWorld, expected: String) {
    let error = world.share_error.as_deref().expect("a share error");
    assert_eq!(error, expected);
}

async fn register_user(world: &mut AppWorld, username: String, email: String, password: String) {
    let input = RegisterInput {
        email: email.clone(),
        username,
        first_name: String::new(),
        last_name: String::new(),
        password: password.clone(),
        password_confirm: password,
    };
    let user = auth::register_user(&world.app_state().db, &input)
        .await
        .expect("register user");
    if world.owner.is_none() {
        world.owner = Some(user.clone());
    }
    world.users.insert(email, user);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
