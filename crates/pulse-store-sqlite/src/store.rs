//! [`SqliteQueue`] — the SQLite implementation of [`SampleQueue`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use pulse_core::{queue::SampleQueue, sample::Sample};

use crate::{
  encode::{RawSample, encode_vec3},
  schema::SCHEMA,
  Error, Result,
};

const SAMPLE_COLUMNS: &str = "time, location, heartrate, stepcount, \
   acceleration, gyro, magnetometer, battery, activeenergy, restingenergy, \
   participantid, sittingtime";

/// A durable sample queue backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// are serialised onto one connection thread, so an append lands either
/// wholly before a drain's transaction or wholly after it.
#[derive(Clone)]
pub struct SqliteQueue {
  conn: tokio_rusqlite::Connection,
}

impl SqliteQueue {
  /// Open (or create) a queue at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let queue = Self { conn };
    queue.init_schema().await?;
    Ok(queue)
  }

  /// Open an in-memory queue — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let queue = Self { conn };
    queue.init_schema().await?;
    Ok(queue)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of samples currently queued. Diagnostic only; the pipeline
  /// itself never polls this.
  pub async fn len(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM samples", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as usize)
  }
}

// ─── SampleQueue impl ────────────────────────────────────────────────────────

impl SampleQueue for SqliteQueue {
  type Error = Error;

  async fn append(&self, sample: Sample) -> Result<()> {
    let acceleration = encode_vec3(sample.acceleration);
    let gyro = encode_vec3(sample.gyro);
    let magnetometer = encode_vec3(sample.magnetometer);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO samples (
             time, location, heartrate, stepcount,
             acceleration, gyro, magnetometer, battery,
             activeenergy, restingenergy, participantid, sittingtime
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            sample.time,
            sample.location,
            sample.heart_rate,
            sample.step_count,
            acceleration,
            gyro,
            magnetometer,
            sample.battery.map(f64::from),
            sample.active_energy,
            sample.resting_energy,
            sample.participant_id,
            sample.sitting_time,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn drain(&self) -> Result<Vec<Sample>> {
    let raws: Vec<RawSample> = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;

        let pairs = {
          let mut stmt = tx.prepare(&format!(
            "SELECT sample_id, {SAMPLE_COLUMNS} FROM samples ORDER BY sample_id"
          ))?;
          stmt
            .query_map([], |row| {
              Ok((
                row.get::<_, i64>(0)?,
                RawSample {
                  time:           row.get(1)?,
                  location:       row.get(2)?,
                  heart_rate:     row.get(3)?,
                  step_count:     row.get(4)?,
                  acceleration:   row.get(5)?,
                  gyro:           row.get(6)?,
                  magnetometer:   row.get(7)?,
                  battery:        row.get(8)?,
                  active_energy:  row.get(9)?,
                  resting_energy: row.get(10)?,
                  participant_id: row.get(11)?,
                  sitting_time:   row.get(12)?,
                },
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let last_id = pairs.last().map(|(id, _)| *id);
        let raws: Vec<RawSample> =
          pairs.into_iter().map(|(_, raw)| raw).collect();

        // Delete only the rows the snapshot saw; anything appended after the
        // snapshot stays for the next drain.
        if let Some(last_id) = last_id {
          tx.execute(
            "DELETE FROM samples WHERE sample_id <= ?1",
            rusqlite::params![last_id],
          )?;
        }

        tx.commit()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }

  async fn participant_id(&self) -> Result<Option<String>> {
    let id: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT participant FROM participants
               ORDER BY record_id DESC LIMIT 1",
              [],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(id)
  }

  async fn set_participant_id(&self, id: &str) -> Result<()> {
    let participant = id.to_owned();
    let written_at = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO participants (participant, written_at) VALUES (?1, ?2)",
          rusqlite::params![participant, written_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
