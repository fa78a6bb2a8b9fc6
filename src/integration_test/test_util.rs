use crate::{SharedData, app_env, db, persistence};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use dotenv::dotenv;
use lazy_static::lazy_static;
use rand::{Rng, thread_rng};
use serde::Serialize;
use sqlx::{Connection, PgConnection, PgPool, Row};
use std::env;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::OnceCell;

lazy_static! {
    static ref TOKIO_RT: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Tokio runtime failed to initialize");
}

/// Old databases are only cleared once per run so parallel tests don't drop each other's
static OLD_DBS_CLEARED: OnceCell<()> = OnceCell::const_new();

struct TestDatabase {
    db_name: String,
}

impl TestDatabase {
    async fn clear_old_dbs(conn: &mut PgConnection) {
        let test_dbs = sqlx::query(
            "SELECT datname FROM pg_catalog.pg_database WHERE datname LIKE 'team_tasks_test_%'",
        )
        .fetch_all(&mut *conn)
        .await;
        let test_dbs = match test_dbs {
            Ok(results) => results
                .into_iter()
                .map(|row| row.get::<String, _>(0))
                .collect::<Vec<_>>(),
            Err(error) => {
                println!(
                    "Warning: failed to look up old test databases. You may need to delete them manually. Error: {error}"
                );
                return;
            }
        };

        for db in test_dbs {
            let result = sqlx::query(&format!("DROP DATABASE IF EXISTS {db}"))
                .execute(&mut *conn)
                .await;
            if result.is_err() {
                println!("Warning: failed to drop old test database {db}, you may need to do it manually.");
            }
        }
    }

    async fn create(conn: &mut PgConnection) -> Result<Self, sqlx::Error> {
        let db_id: u32 = thread_rng().gen_range(10_000..99_999);
        let db_name = format!("team_tasks_test_{db_id}");

        sqlx::query(&format!("CREATE DATABASE {db_name}"))
            .execute(&mut *conn)
            .await?;

        Ok(Self { db_name })
    }
}

/// Creates a fresh, migrated database for a test, seeds it with the given users, and hands a
/// pool for it to the test. Databases left over from earlier runs are dropped by the first test.
///
/// Expects that the TEST_DB_URL environment variable is populated with a connection string
/// that has no database name in its path
pub fn prepare_db_and_test<F, R>(users: &[(&str, Option<&str>, &str)], test_fn: F)
where
    R: Future<Output = ()>,
    F: FnOnce(PgPool) -> R,
{
    if dotenv().is_err() {
        println!("Test is running without .env file.");
    }

    TOKIO_RT.block_on(async move {
        let pg_connection_base_url = env::var(app_env::test::TEST_DB_URL).expect(
            "You must provide the TEST_DB_URL environment variable as the base postgres connection string",
        );
        let test_db = {
            let mut initial_conn = PgConnection::connect(&format!("{pg_connection_base_url}/postgres"))
                .await
                .expect("Test failure - could not create initial connection to provision database.");
            OLD_DBS_CLEARED
                .get_or_init(|| TestDatabase::clear_old_dbs(&mut initial_conn))
                .await;
            let test_db = TestDatabase::create(&mut initial_conn)
                .await
                .unwrap_or_else(|db_err| panic!("Failed to start test database: {db_err}"));
            let _ = initial_conn.close().await;

            test_db
        };

        let sqlx_pool = db::connect_sqlx(&format!("{pg_connection_base_url}/{}", test_db.db_name))
            .await
            .expect("Could not connect to the test database");
        db::migrate(&sqlx_pool)
            .await
            .expect("Could not migrate the test database");
        for &(username, email, full_name) in users {
            sqlx::query("INSERT INTO users(username, email, full_name) VALUES ($1, $2, $3)")
                .bind(username)
                .bind(email)
                .bind(full_name)
                .execute(&sqlx_pool)
                .await
                .expect("Could not seed test user");
        }

        test_fn(sqlx_pool).await;
    });
}

/// Builds the full application router on top of a test database
pub fn router_for(db: PgPool) -> Router {
    crate::build_router(Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(db),
    }))
}

/// Builds a request carrying a JSON body
pub fn json_request(method: &str, uri: &str, body: &impl Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(body).expect("Could not serialize request body"),
        ))
        .expect("Could not build request")
}

/// Builds a request with no body
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("Could not build request")
}
