use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{
    helpers::{decode_route, encode_route, parse_datetime, to_i64, to_u64},
    Database,
};
use crate::models::WorkoutSession;

const WORKOUT_COLUMNS: &str = "id, started_at, completed_at, distance_meters, duration_ms, calories_kcal, average_pace_kmh, route_points";

/// Lifetime totals across the stored history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTotals {
    pub workout_count: u64,
    pub distance_meters: f64,
    pub duration_ms: u64,
    pub calories_kcal: f64,
}

fn row_to_workout(row: &Row) -> Result<WorkoutSession> {
    let started_at: String = row.get("started_at")?;
    let completed_at: String = row.get("completed_at")?;
    let duration_ms: i64 = row.get("duration_ms")?;
    let route_points: String = row.get("route_points")?;

    Ok(WorkoutSession {
        id: row.get("id")?,
        distance_meters: row.get("distance_meters")?,
        duration_millis: to_u64(duration_ms, "duration_ms")?,
        calories_kcal: row.get("calories_kcal")?,
        route_points: decode_route(&route_points)?,
        average_pace_kmh: row.get("average_pace_kmh")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        timestamp: parse_datetime(&completed_at, "completed_at")?,
    })
}

impl Database {
    pub async fn insert_workout(&self, workout: &WorkoutSession) -> Result<()> {
        let record = workout.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO workouts (id, started_at, completed_at, distance_meters, duration_ms, calories_kcal, average_pace_kmh, route_points, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.timestamp.to_rfc3339(),
                    record.distance_meters,
                    to_i64(record.duration_millis)?,
                    record.calories_kcal,
                    record.average_pace_kmh,
                    encode_route(&record.route_points)?,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert workout {}", record.id))?;
            Ok(())
        })
        .await
    }

    pub async fn get_workout(&self, workout_id: &str) -> Result<Option<WorkoutSession>> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![workout_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_workout(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Newest first.
    pub async fn list_workouts(&self, limit: u32, offset: u32) -> Result<Vec<WorkoutSession>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WORKOUT_COLUMNS} FROM workouts
                 ORDER BY completed_at DESC
                 LIMIT ?1 OFFSET ?2"
            ))?;
            let mut rows = stmt.query(params![limit, offset])?;
            let mut workouts = Vec::new();
            while let Some(row) = rows.next()? {
                workouts.push(row_to_workout(row)?);
            }
            Ok(workouts)
        })
        .await
    }

    /// Returns false when no workout had that id.
    pub async fn delete_workout(&self, workout_id: &str) -> Result<bool> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            let deleted = conn
                .execute("DELETE FROM workouts WHERE id = ?1", params![workout_id])
                .context("failed to delete workout")?;
            Ok(deleted > 0)
        })
        .await
    }

    pub async fn workout_totals(&self) -> Result<WorkoutTotals> {
        self.execute(|conn| {
            let totals = conn
                .query_row(
                    "SELECT COUNT(*), COALESCE(SUM(distance_meters), 0), COALESCE(SUM(duration_ms), 0), COALESCE(SUM(calories_kcal), 0)
                     FROM workouts",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, f64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, f64>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((count, distance, duration, calories)) = totals else {
                return Ok(WorkoutTotals::default());
            };

            Ok(WorkoutTotals {
                workout_count: to_u64(count, "workout_count")?,
                distance_meters: distance,
                duration_ms: to_u64(duration, "duration_ms")?,
                calories_kcal: calories,
            })
        })
        .await
    }
}
