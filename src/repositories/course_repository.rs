use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{errors::AppResult, models::domain::Course};

/// Read-only lookup against the course catalog's relational store. Optional
/// collaborator: when it is not configured, submissions simply carry no
/// course recommendations.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn get_courses_by_ids(&self, course_ids: &[i32]) -> AppResult<Vec<Course>>;
}

pub struct PgCourseRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: i32,
    name: String,
    description: Option<String>,
    pic_url: Option<String>,
    lesson_count: Option<i64>,
}

impl PgCourseRepository {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        log::info!("Successfully connected to the course catalog database");

        Ok(Self { pool })
    }
}

#[async_trait]
impl CourseCatalog for PgCourseRepository {
    async fn get_courses_by_ids(&self, course_ids: &[i32]) -> AppResult<Vec<Course>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<CourseRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.name, c.description, c.pic_url, COUNT(l.id) AS lesson_count
            FROM courses c
            LEFT JOIN lessons l ON l.course_id = c.id
            WHERE c.id = ANY($1)
            GROUP BY c.id, c.name, c.description, c.pic_url
            ORDER BY c.id
            "#,
        )
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await?;

        let courses = rows
            .into_iter()
            .map(|row| Course {
                id: row.id,
                name: row.name,
                description: row.description.unwrap_or_default(),
                pic_url: row.pic_url.unwrap_or_default(),
                lesson_count: row.lesson_count.unwrap_or(0),
            })
            .collect();

        Ok(courses)
    }
}
