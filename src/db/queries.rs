// Group and membership queries.
//
// User rows are handled by `auth::UserStore`; everything the group API needs
// lives here as plain associated functions over the pool.

use crate::db::connection::Db;
use crate::db::schema::*;
use anyhow::Result;

pub struct QueryBuilder;

impl QueryBuilder {
    /// Create a group and register its creator as owner.
    ///
    /// Both inserts run in a single transaction. Returns the new group id.
    pub async fn create_group(db: &Db, data: &GroupCreate) -> Result<i64> {
        let mut tx = db.begin().await?;

        let group_id = sqlx::query("INSERT INTO `groups` (`name`, `creator_id`) VALUES (?, ?)")
            .bind(&data.name)
            .bind(data.creator_id)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("INSERT INTO `members` (`group_id`, `user_id`, `role`) VALUES (?, ?, ?)")
            .bind(group_id)
            .bind(data.creator_id)
            .bind(MemberRole::Owner.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group_id)
    }

    pub async fn find_group_by_id(db: &Db, group_id: i64) -> Result<Option<GroupRecord>> {
        let group = sqlx::query_as::<_, GroupRecord>(
            r#"
            SELECT `id`, `name`, `creator_id`, `signup_code`, `is_enabled`, `created_at`
            FROM `groups`
            WHERE `id` = ?
            "#,
        )
        .bind(group_id)
        .fetch_optional(db)
        .await?;

        Ok(group)
    }

    /// Set or clear (`None`) the signup code of a group.
    pub async fn update_signup_code(
        db: &Db,
        group_id: i64,
        signup_code: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE `groups` SET `signup_code` = ? WHERE `id` = ?")
            .bind(signup_code)
            .bind(group_id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// Soft-delete a group and drop all of its memberships.
    pub async fn disable_group(db: &Db, group_id: i64) -> Result<()> {
        let mut tx = db.begin().await?;

        sqlx::query("UPDATE `groups` SET `is_enabled` = 0 WHERE `id` = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM `members` WHERE `group_id` = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// One page of the enabled groups a user belongs to, oldest first.
    pub async fn list_groups_for_user(
        db: &Db,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GroupListingRow>> {
        let rows = sqlx::query_as::<_, GroupListingRow>(
            r#"
            SELECT `groups`.`id`, `groups`.`name`, `groups`.`creator_id`, `members`.`role`,
                   `groups`.`signup_code`, `groups`.`created_at`
            FROM `groups`
            JOIN `members` ON `groups`.`id` = `members`.`group_id`
            WHERE `members`.`user_id` = ? AND `groups`.`is_enabled` = 1
            ORDER BY `groups`.`id` ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    pub async fn count_groups_for_user(db: &Db, user_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(`groups`.`id`)
            FROM `groups`
            JOIN `members` ON `groups`.`id` = `members`.`group_id`
            WHERE `members`.`user_id` = ? AND `groups`.`is_enabled` = 1
            "#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;

        Ok(count)
    }
}
