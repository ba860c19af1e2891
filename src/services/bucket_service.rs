use std::collections::HashMap;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::bucket_repository::BucketRepository;
use crate::db::repositories::time_target_repository::TimeTargetRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::bucket::{Bucket, BucketCreateInput, BucketNode, BucketUpdateInput, TimeTarget};

pub const DEFAULT_BUCKET_COLOR: &str = "#6366f1";
pub const BUCKET_IN_USE_MESSAGE: &str =
    "Cannot delete this bucket because it has time entries, tasks, or goals associated with it.";
const MAX_NAME_CHARS: usize = 80;

#[derive(Clone)]
pub struct BucketService {
    db: DbPool,
}

impl BucketService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create(&self, user_id: &str, input: BucketCreateInput) -> AppResult<Bucket> {
        let name = normalize_name(&input.name)?;
        let color = normalize_color(input.color)?;
        let now = Utc::now().to_rfc3339();
        let id = uuid::Uuid::new_v4().to_string();

        let bucket = self.db.with_connection(|conn| {
            let parent_bucket_id = normalize_optional_string(input.parent_bucket_id);
            if let Some(parent_id) = parent_bucket_id.as_deref() {
                ensure_valid_parent(conn, user_id, &id, parent_id)?;
            }

            let sort_order = BucketRepository::max_sort_order(conn, user_id)?
                .map(|max| max + 1)
                .unwrap_or(0);

            let bucket = Bucket {
                id: id.clone(),
                user_id: user_id.to_string(),
                name,
                description: normalize_optional_string(input.description),
                parent_bucket_id,
                color,
                icon: normalize_optional_string(input.icon),
                sort_order,
                is_active: true,
                created_at: now.clone(),
                updated_at: now,
            };
            BucketRepository::insert(conn, &bucket)?;
            Ok(bucket)
        })?;

        info!(target: "app::buckets", bucket_id = %bucket.id, "bucket created");
        Ok(bucket)
    }

    pub fn update(&self, user_id: &str, id: &str, update: BucketUpdateInput) -> AppResult<Bucket> {
        let bucket = self.db.with_connection(|conn| {
            let mut bucket = fetch_bucket(conn, user_id, id)?;

            if let Some(name) = update.name {
                bucket.name = normalize_name(&name)?;
            }
            if let Some(description) = update.description {
                bucket.description = normalize_optional_string(description);
            }
            if let Some(parent) = update.parent_bucket_id {
                let parent = normalize_optional_string(parent);
                if let Some(parent_id) = parent.as_deref() {
                    ensure_valid_parent(conn, user_id, id, parent_id)?;
                    if !BucketRepository::list_children(conn, user_id, id)?.is_empty() {
                        return Err(AppError::validation(
                            "a bucket with sub-buckets cannot be nested",
                        ));
                    }
                }
                bucket.parent_bucket_id = parent;
            }
            if let Some(color) = update.color {
                bucket.color = normalize_color(Some(color))?;
            }
            if let Some(icon) = update.icon {
                bucket.icon = normalize_optional_string(Some(icon));
            }
            if let Some(sort_order) = update.sort_order {
                bucket.sort_order = sort_order;
            }
            if let Some(is_active) = update.is_active {
                bucket.is_active = is_active;
            }

            bucket.updated_at = Utc::now().to_rfc3339();
            BucketRepository::update(conn, &bucket)?;
            Ok(bucket)
        })?;

        info!(target: "app::buckets", bucket_id = %bucket.id, "bucket updated");
        Ok(bucket)
    }

    pub fn archive(&self, user_id: &str, id: &str) -> AppResult<Bucket> {
        self.update(
            user_id,
            id,
            BucketUpdateInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
    }

    /// Sub-buckets block deletion outright; other dependents surface as a
    /// foreign-key conflict with a readable message.
    pub fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| {
            fetch_bucket(conn, user_id, id)?;
            if !BucketRepository::list_children(conn, user_id, id)?.is_empty() {
                return Err(AppError::conflict(
                    "Cannot delete a bucket that has sub-buckets. Delete or move them first.",
                ));
            }
            BucketRepository::delete(conn, user_id, id)
                .map_err(|err| err.explain_foreign_key(BUCKET_IN_USE_MESSAGE))
        })?;

        info!(target: "app::buckets", bucket_id = %id, "bucket deleted");
        Ok(())
    }

    pub fn get(&self, user_id: &str, id: &str) -> AppResult<Bucket> {
        let bucket = self.db.with_connection(|conn| fetch_bucket(conn, user_id, id))?;
        debug!(target: "app::buckets", bucket_id = %bucket.id, "bucket fetched");
        Ok(bucket)
    }

    pub fn list(&self, user_id: &str, include_inactive: bool) -> AppResult<Vec<Bucket>> {
        let buckets = self
            .db
            .with_connection(|conn| BucketRepository::list(conn, user_id, include_inactive))?;
        debug!(target: "app::buckets", count = buckets.len(), "buckets listed");
        Ok(buckets)
    }

    /// Top-level buckets in sort order, each with its direct children.
    pub fn tree(&self, user_id: &str, include_inactive: bool) -> AppResult<Vec<BucketNode>> {
        let (buckets, targets) = self.db.with_connection(|conn| {
            Ok((
                BucketRepository::list(conn, user_id, include_inactive)?,
                TimeTargetRepository::list(conn, user_id)?,
            ))
        })?;
        Ok(build_tree(buckets, &targets))
    }

    pub fn set_target(&self, user_id: &str, bucket_id: &str, target_percent: f64) -> AppResult<TimeTarget> {
        if !target_percent.is_finite() || !(0.0..=100.0).contains(&target_percent) {
            return Err(AppError::validation("target percent must be between 0 and 100"));
        }

        let target = self.db.with_transaction(|conn| {
            fetch_bucket(conn, user_id, bucket_id)?;

            let others: f64 = TimeTargetRepository::list(conn, user_id)?
                .iter()
                .filter(|target| target.bucket_id != bucket_id)
                .map(|target| target.target_percent)
                .sum();
            if others + target_percent > 100.0 + 1e-9 {
                return Err(AppError::validation_with_details(
                    "time targets cannot add up to more than 100%",
                    serde_json::json!({ "allocated": others, "requested": target_percent }),
                ));
            }

            let now = Utc::now().to_rfc3339();
            let existing = TimeTargetRepository::find_by_bucket(conn, user_id, bucket_id)?;
            let target = TimeTarget {
                id: existing
                    .as_ref()
                    .map(|target| target.id.clone())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                user_id: user_id.to_string(),
                bucket_id: bucket_id.to_string(),
                target_percent,
                created_at: existing
                    .map(|target| target.created_at)
                    .unwrap_or_else(|| now.clone()),
                updated_at: now,
            };
            TimeTargetRepository::upsert(conn, &target)?;
            Ok(target)
        })?;

        info!(
            target: "app::buckets",
            bucket_id,
            target_percent,
            "time target saved"
        );
        Ok(target)
    }

    pub fn clear_target(&self, user_id: &str, bucket_id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| TimeTargetRepository::delete_for_bucket(conn, user_id, bucket_id))?;
        info!(target: "app::buckets", bucket_id, "time target cleared");
        Ok(())
    }

    pub fn list_targets(&self, user_id: &str) -> AppResult<Vec<TimeTarget>> {
        self.db
            .with_connection(|conn| TimeTargetRepository::list(conn, user_id))
    }
}

pub(crate) fn fetch_bucket(conn: &Connection, user_id: &str, id: &str) -> AppResult<Bucket> {
    BucketRepository::find_by_id(conn, user_id, id)?.ok_or_else(AppError::not_found)
}

/// A parent must be another top-level bucket of the same user.
fn ensure_valid_parent(conn: &Connection, user_id: &str, id: &str, parent_id: &str) -> AppResult<()> {
    if parent_id == id {
        return Err(AppError::validation("a bucket cannot be its own parent"));
    }
    let parent = BucketRepository::find_by_id(conn, user_id, parent_id)?
        .ok_or_else(|| AppError::validation("parent bucket does not exist"))?;
    if !parent.is_top_level() {
        return Err(AppError::validation("parent bucket must be a top-level bucket"));
    }
    Ok(())
}

fn build_tree(buckets: Vec<Bucket>, targets: &[TimeTarget]) -> Vec<BucketNode> {
    let target_map: HashMap<&str, f64> = targets
        .iter()
        .map(|target| (target.bucket_id.as_str(), target.target_percent))
        .collect();

    let (top, children): (Vec<Bucket>, Vec<Bucket>) =
        buckets.into_iter().partition(Bucket::is_top_level);

    let mut by_parent: HashMap<String, Vec<Bucket>> = HashMap::new();
    for child in children {
        if let Some(parent) = child.parent_bucket_id.clone() {
            by_parent.entry(parent).or_default().push(child);
        }
    }

    top.into_iter()
        .map(|bucket| BucketNode {
            target_percent: target_map.get(bucket.id.as_str()).copied(),
            children: by_parent.remove(&bucket.id).unwrap_or_default(),
            bucket,
        })
        .collect()
}

fn normalize_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("bucket name is required"));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::validation("bucket name must be 80 characters or fewer"));
    }
    Ok(trimmed.to_string())
}

fn normalize_color(color: Option<String>) -> AppResult<String> {
    match normalize_optional_string(color) {
        None => Ok(DEFAULT_BUCKET_COLOR.to_string()),
        Some(value) if is_hex_color(&value) => Ok(value.to_lowercase()),
        Some(_) => Err(AppError::validation("color must be a hex value like #22c55e")),
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|ch| ch.is_ascii_hexdigit())
}

pub(crate) fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const USER: &str = "user-1";

    fn setup_service() -> (BucketService, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("buckets.sqlite")).expect("db pool");
        (BucketService::new(pool), dir)
    }

    fn create(service: &BucketService, name: &str, parent: Option<&str>) -> Bucket {
        service
            .create(
                USER,
                BucketCreateInput {
                    name: name.into(),
                    parent_bucket_id: parent.map(String::from),
                    ..Default::default()
                },
            )
            .expect("create bucket")
    }

    #[test]
    fn sort_order_increments_and_defaults_apply() {
        let (service, _dir) = setup_service();
        let first = create(&service, "  Career ", None);
        let second = create(&service, "Health", None);
        assert_eq!(first.name, "Career");
        assert_eq!(first.color, DEFAULT_BUCKET_COLOR);
        assert_eq!(second.sort_order, first.sort_order + 1);
    }

    #[test]
    fn hierarchy_is_single_level() {
        let (service, _dir) = setup_service();
        let root = create(&service, "Career", None);
        let child = create(&service, "Side projects", Some(&root.id));

        let nested = service.create(
            USER,
            BucketCreateInput {
                name: "Too deep".into(),
                parent_bucket_id: Some(child.id.clone()),
                ..Default::default()
            },
        );
        assert!(matches!(nested, Err(AppError::Validation { .. })));

        let self_parent = service.update(
            USER,
            &root.id,
            BucketUpdateInput {
                parent_bucket_id: Some(Some(root.id.clone())),
                ..Default::default()
            },
        );
        assert!(matches!(self_parent, Err(AppError::Validation { .. })));

        let other = create(&service, "Health", None);
        let parent_with_children = service.update(
            USER,
            &root.id,
            BucketUpdateInput {
                parent_bucket_id: Some(Some(other.id.clone())),
                ..Default::default()
            },
        );
        assert!(matches!(parent_with_children, Err(AppError::Validation { .. })));

        let tree = service.tree(USER, false).expect("tree");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, child.id);
    }

    #[test]
    fn delete_refuses_parent_with_children() {
        let (service, _dir) = setup_service();
        let root = create(&service, "Career", None);
        create(&service, "Side projects", Some(&root.id));

        let result = service.delete(USER, &root.id);
        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[test]
    fn targets_cannot_exceed_full_capacity() {
        let (service, _dir) = setup_service();
        let work = create(&service, "Work", None);
        let health = create(&service, "Health", None);

        service.set_target(USER, &work.id, 60.0).expect("work target");
        let replaced = service.set_target(USER, &work.id, 50.0).expect("replace");
        assert_eq!(replaced.target_percent, 50.0);

        let too_much = service.set_target(USER, &health.id, 60.0);
        assert!(matches!(too_much, Err(AppError::Validation { .. })));

        service.set_target(USER, &health.id, 50.0).expect("fits exactly");
        assert_eq!(service.list_targets(USER).unwrap().len(), 2);

        service.clear_target(USER, &work.id).expect("clear");
        assert_eq!(service.list_targets(USER).unwrap().len(), 1);
    }

    #[test]
    fn buckets_are_scoped_per_user() {
        let (service, _dir) = setup_service();
        let bucket = create(&service, "Career", None);
        assert!(matches!(
            service.get("someone-else", &bucket.id),
            Err(AppError::NotFound)
        ));
        assert!(service.list("someone-else", true).unwrap().is_empty());
    }
}
