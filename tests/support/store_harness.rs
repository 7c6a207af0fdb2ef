#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use strata::appdata::BundledDefaults;
use strata::catalog;
use strata::config::{Config, StoreLayout};
use strata::migration::{DriverRegistry, Migrator};
use strata::schema::{Record, SchemaRegistry, TableDef, Value};
use strata::store::{
    Session, SessionMode, TenantConfig, count_rows, create_database, open_pool,
};

pub const APP_VERSION: &str = "9.9.9";

/// A throwaway working directory with a default configuration.
pub struct Deployment {
    pub tmp: TempDir,
    pub config: Config,
}

impl Deployment {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let config = Config {
            working_path: tmp.path().to_path_buf(),
            ..Config::default()
        };
        Self { tmp, config }
    }

    pub fn layout(&self) -> StoreLayout {
        self.config.layout()
    }

    pub fn registry() -> Arc<SchemaRegistry> {
        Arc::new(catalog::registry().expect("bundled registry"))
    }

    pub fn migrator(&self) -> Migrator {
        Migrator::from_config(&self.config)
            .expect("migrator")
            .with_app_version(APP_VERSION)
    }

    pub fn migrator_with(&self, drivers: DriverRegistry) -> Migrator {
        Migrator::new(
            self.layout(),
            Self::registry(),
            drivers,
            Arc::new(BundledDefaults),
        )
        .with_app_version(APP_VERSION)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.layout().staging_dir().to_path_buf()
    }
}

/// Content of a seeded live database.
pub struct Seed {
    pub users: usize,
    pub tips: usize,
    pub languages: Vec<&'static str>,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            users: 3,
            tips: 2,
            languages: vec!["en"],
        }
    }
}

/// A record in `def`'s layout: defaults overlaid with `values`; columns the
/// layout lacks are ignored.
fn row(def: &TableDef, values: &[(&str, Value)]) -> Record {
    let mut record = def.default_record();
    for (column, value) in values {
        if def.has_field(column) {
            record.insert((*column).to_string(), value.clone());
        }
    }
    record
}

/// Write a live database at `version` where the layout expects it.
pub async fn seed_live(layout: &StoreLayout, version: u32, seed: &Seed) -> PathBuf {
    let registry = Deployment::registry();
    let schema = Arc::new(registry.target_schema(version).expect("supported version").clone());
    let path = layout.live_db(version);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("live dir");
    }
    create_database(&path, &schema).await.expect("create live db");

    let mut session = Session::open(&path, schema.clone(), SessionMode::ReadWrite)
        .await
        .expect("open live db");

    if let Some(def) = schema.get("Tenant") {
        session
            .insert("Tenant", &row(def, &[("id", Value::from(1))]))
            .await
            .expect("tenant");
    }
    if let Some(def) = schema.get("Node") {
        let node = row(
            def,
            &[
                ("id", Value::from(1)),
                ("name", Value::from("Acme")),
                ("enable_signup", Value::from(true)),
            ],
        );
        session.insert("Node", &node).await.expect("node");
    }

    let config = schema.get("Config").expect("config table").clone();
    for (group, name, value) in [
        ("node", "version_db", version.to_string()),
        ("node", "name", "\"Old name\"".to_string()),
        ("notification", "smtp_server", "\"mail.example.org\"".to_string()),
    ] {
        let entry = row(
            &config,
            &[
                ("var_group", Value::from(group)),
                ("var_name", Value::from(name)),
                ("value", Value::from(value)),
            ],
        );
        session.insert("Config", &entry).await.expect("config");
    }

    let languages = schema.get("EnabledLanguage").expect("languages").clone();
    for lang in &seed.languages {
        session
            .insert("EnabledLanguage", &row(&languages, &[("name", Value::from(*lang))]))
            .await
            .expect("language");
    }

    let users = schema.get("User").expect("users").clone();
    let mail_column = if users.has_field("email") { "email" } else { "mail_address" };
    for n in 1..=seed.users {
        let user = row(
            &users,
            &[
                ("id", Value::from(format!("u{n}"))),
                ("username", Value::from(format!("user{n}"))),
                (mail_column, Value::from(format!("user{n}@example.org"))),
            ],
        );
        session.insert("User", &user).await.expect("user");
    }

    let contexts = schema.get("Context").expect("contexts").clone();
    session
        .insert("Context", &row(&contexts, &[("id", Value::from("c1"))]))
        .await
        .expect("context");

    let tips = schema.get("InternalTip").expect("tips").clone();
    for n in 1..=seed.tips {
        let tip = row(
            &tips,
            &[
                ("id", Value::from(format!("t{n}"))),
                ("context_id", Value::from("c1")),
                ("progressive", Value::from(i64::try_from(n).unwrap_or_default())),
            ],
        );
        session.insert("InternalTip", &tip).await.expect("tip");
    }

    session.commit().await.expect("commit seed");
    session.close().await;
    path
}

pub async fn count(path: &Path, table: &str) -> u64 {
    let pool = open_pool(path, SessionMode::ReadOnly).await.expect("open");
    let n = count_rows(&pool, table).await.expect("count");
    pool.close().await;
    n
}

pub async fn config_value(path: &Path, tid: i64, key: &str) -> Option<serde_json::Value> {
    let pool = open_pool(path, SessionMode::ReadOnly).await.expect("open");
    let mut conn = pool.acquire().await.expect("acquire");
    let value = TenantConfig::new(tid)
        .get(&mut conn, key)
        .await
        .expect("config get");
    drop(conn);
    pool.close().await;
    value
}

pub async fn column_names(path: &Path, table: &str) -> Vec<String> {
    let pool = open_pool(path, SessionMode::ReadOnly).await.expect("open");
    let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(&pool)
        .await
        .expect("table info");
    pool.close().await;
    names.into_iter().map(|(n,)| n).collect()
}

pub async fn fetch_strings(path: &Path, sql: &str) -> Vec<Option<String>> {
    let pool = open_pool(path, SessionMode::ReadOnly).await.expect("open");
    let rows: Vec<(Option<String>,)> = sqlx::query_as(sql).fetch_all(&pool).await.expect("query");
    pool.close().await;
    rows.into_iter().map(|(v,)| v).collect()
}
