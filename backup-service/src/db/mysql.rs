//! MySQL/MariaDB client built on `mysql_async`.

use super::{DatabaseClient, TableSnapshot};
use crate::config::ServerEndpoint;
use crate::Result;
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Row, Value};

pub struct MySqlClient {
    endpoint: ServerEndpoint,
}

impl MySqlClient {
    pub fn new(endpoint: ServerEndpoint) -> Self {
        Self { endpoint }
    }

    fn opts(&self, database: Option<&str>) -> OptsBuilder {
        let database = database.or(self.endpoint.database.as_deref());
        OptsBuilder::default()
            .ip_or_hostname(self.endpoint.host.clone())
            .tcp_port(self.endpoint.port)
            .user(Some(self.endpoint.user.clone()))
            .pass(Some(self.endpoint.password.expose().to_string()))
            .db_name(database.map(str::to_string))
    }

    async fn connect(&self, database: Option<&str>) -> Result<Conn> {
        Ok(Conn::new(self.opts(database)).await?)
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn ping(&self) -> Result<()> {
        let conn = self.connect(None).await?;
        conn.disconnect().await?;
        Ok(())
    }

    async fn databases(&self) -> Result<Vec<String>> {
        let mut conn = self.connect(None).await?;
        let names: Vec<String> = conn.query("SHOW DATABASES").await?;
        conn.disconnect().await?;
        Ok(names)
    }

    async fn tables(&self, database: &str) -> Result<Vec<String>> {
        let mut conn = self.connect(Some(database)).await?;
        let names: Vec<String> = conn.query("SHOW TABLES").await?;
        conn.disconnect().await?;
        Ok(names)
    }

    async fn table_snapshot(&self, database: &str, table: &str) -> Result<TableSnapshot> {
        let mut conn = self.connect(Some(database)).await?;

        let snapshot = {
            let mut result = conn
                .query_iter(format!("SELECT * FROM {}", quote_identifier(table)))
                .await?;
            let columns: Vec<String> = result
                .columns_ref()
                .iter()
                .map(|c| c.name_str().into_owned())
                .collect();
            let rows: Vec<Row> = result.collect().await?;
            TableSnapshot {
                columns,
                rows: rows
                    .into_iter()
                    .map(|row| row.unwrap().iter().map(render_value).collect())
                    .collect(),
            }
        };

        conn.disconnect().await?;
        Ok(snapshot)
    }
}

/// Backtick-quote an identifier, doubling embedded backticks.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Text rendering of a column value for flat-file export. NULL becomes an
/// empty field.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::NULL => String::new(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            if (*hour, *minute, *second, *micros) == (0, 0, 0, 0) {
                format!("{:04}-{:02}-{:02}", year, month, day)
            } else if *micros == 0 {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                )
            } else {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                    year, month, day, hour, minute, second, micros
                )
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u32::from(*hours) + *days * 24;
            if *micros == 0 {
                format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
            } else {
                format!("{}{:02}:{:02}:{:02}.{:06}", sign, hours, minutes, seconds, micros)
            }
        }
    }
}
