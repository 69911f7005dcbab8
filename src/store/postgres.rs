use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};

use crate::blob::StoredBlob;

use super::{
	Category, CategoryStore, Error, Image, ImageStore, LikeStatus, LikeStore, MyPagePostRow,
	NewPost, NewUser, PostChanges, PostOrder, PostRow, PostStore, ProfileChanges, ReplyStore,
	Result, Skill, SkillStore, Slice, UniqueField, User, UserStore, Window,
	DEFAULT_PROFILE_IMAGE_ID,
};

const USER_COLUMNS: &str = r#"
	SELECT id, email, password, name, nickname, phone, image_id, is_deleted, created_at
	FROM "user"
"#;

const POST_ROW: &str = r#"
	SELECT p.id, p.user_id, u.nickname, p.category_id, p.title, p.content, p.view,
		(SELECT COUNT(*) FROM post_like l WHERE l.post_id = p.id) AS like_count,
		p.created_at
	FROM post p
	JOIN "user" u ON u.id = p.user_id
"#;

/// `$1` is the viewing user.
const MY_PAGE_ROW: &str = r#"
	SELECT p.id, p.category_id, p.title, p.view,
		(SELECT COUNT(*) FROM post_like l WHERE l.post_id = p.id) AS like_count,
		(SELECT COUNT(*) FROM reply r WHERE r.post_id = p.id) AS reply_count,
		EXISTS (SELECT 1 FROM post_like l WHERE l.post_id = p.id AND l.user_id = $1) AS liked,
		EXISTS (SELECT 1 FROM reply r WHERE r.post_id = p.id AND r.user_id = $1) AS replied,
		p.created_at
	FROM post p
"#;

/// Turns unique violations into [`Error::Conflict`] carrying the index name.
fn conflict(error: sqlx::Error) -> Error {
	if let sqlx::Error::Database(database) = &error {
		if database.is_unique_violation() {
			if let Some(constraint) = database.constraint() {
				return Error::Conflict(constraint.to_owned());
			}
		}
	}

	Error::Database(error)
}

async fn insert_attachments(conn: &mut PgConnection, post_id: i64, images: &[StoredBlob]) -> Result<()> {
	for blob in images {
		let image_id = sqlx::query_scalar::<_, i64>(
			"INSERT INTO image (image_url, blob_key) VALUES ($1, $2) RETURNING id",
		)
		.bind(&blob.url)
		.bind(&blob.key)
		.fetch_one(&mut *conn)
		.await?;

		sqlx::query("INSERT INTO image_post (post_id, image_id) VALUES ($1, $2)")
			.bind(post_id)
			.bind(image_id)
			.execute(&mut *conn)
			.await?;
	}

	Ok(())
}

#[derive(Debug, Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	/// Connects to the database and applies pending migrations.
	pub async fn connect(url: &str) -> Result<Self> {
		let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

		sqlx::migrate!().run(&pool).await?;

		Ok(Self::new(pool))
	}
}

#[async_trait]
impl UserStore for PgStore {
	async fn user_exists(&self, field: UniqueField, value: &str) -> Result<bool> {
		let column = match field {
			UniqueField::Email => "email",
			UniqueField::Nickname => "nickname",
			UniqueField::Phone => "phone",
		};

		let exists = sqlx::query_scalar::<_, bool>(&format!(
			r#"SELECT EXISTS (SELECT 1 FROM "user" WHERE {column} = $1 AND NOT is_deleted)"#
		))
		.bind(value)
		.fetch_one(&self.pool)
		.await?;

		Ok(exists)
	}

	async fn insert_user(&self, user: NewUser) -> Result<i64> {
		sqlx::query_scalar::<_, i64>(
			r#"
				INSERT INTO "user" (email, password, name, nickname, phone, image_id)
				VALUES ($1, $2, $3, $4, $5, $6)
				RETURNING id
			"#,
		)
		.bind(user.email)
		.bind(user.password)
		.bind(user.name)
		.bind(user.nickname)
		.bind(user.phone)
		.bind(user.image_id)
		.fetch_one(&self.pool)
		.await
		.map_err(conflict)
	}

	async fn find_user(&self, id: i64) -> Result<Option<User>> {
		let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE id = $1"))
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(user)
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
		let user = sqlx::query_as::<_, User>(&format!(
			"{USER_COLUMNS} WHERE email = $1 ORDER BY is_deleted, id DESC LIMIT 1"
		))
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		Ok(user)
	}

	async fn find_user_by_email_and_name(&self, email: &str, name: &str) -> Result<Option<User>> {
		let user = sqlx::query_as::<_, User>(&format!(
			"{USER_COLUMNS} WHERE email = $1 AND name = $2 AND NOT is_deleted"
		))
		.bind(email)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		Ok(user)
	}

	async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<i64>> {
		let mut tx = self.pool.begin().await?;

		let Some(previous) =
			sqlx::query_scalar::<_, i64>(r#"SELECT image_id FROM "user" WHERE id = $1 FOR UPDATE"#)
				.bind(id)
				.fetch_optional(&mut *tx)
				.await?
		else {
			return Ok(None);
		};

		let replaced = changes.image_id.filter(|image_id| *image_id != previous).map(|_| previous);

		sqlx::query(
			r#"
				UPDATE "user"
				SET name = $1, nickname = $2, phone = $3, image_id = COALESCE($4, image_id)
				WHERE id = $5
			"#,
		)
		.bind(changes.name)
		.bind(changes.nickname)
		.bind(changes.phone)
		.bind(changes.image_id)
		.bind(id)
		.execute(&mut *tx)
		.await
		.map_err(conflict)?;

		sqlx::query("DELETE FROM user_skill WHERE user_id = $1 AND NOT (skill_id = ANY($2))")
			.bind(id)
			.bind(&changes.skill_ids[..])
			.execute(&mut *tx)
			.await?;

		sqlx::query(
			r#"
				INSERT INTO user_skill (user_id, skill_id)
				SELECT $1, UNNEST($2::BIGINT[])
				ON CONFLICT DO NOTHING
			"#,
		)
		.bind(id)
		.bind(&changes.skill_ids[..])
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(replaced)
	}

	async fn update_password(&self, id: i64, password: &str) -> Result<()> {
		sqlx::query(r#"UPDATE "user" SET password = $1 WHERE id = $2"#)
			.bind(password)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	async fn soft_delete_user(&self, id: i64) -> Result<()> {
		sqlx::query(r#"UPDATE "user" SET is_deleted = TRUE WHERE id = $1"#)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(())
	}
}

#[async_trait]
impl SkillStore for PgStore {
	async fn find_skills_by_name(&self, names: &[String]) -> Result<Vec<Skill>> {
		let skills = sqlx::query_as::<_, Skill>(
			"SELECT id, skill_name FROM skill WHERE skill_name = ANY($1)",
		)
		.bind(names)
		.fetch_all(&self.pool)
		.await?;

		Ok(skills)
	}

	async fn user_skills(&self, user_id: i64) -> Result<Vec<Skill>> {
		let skills = sqlx::query_as::<_, Skill>(
			r#"
				SELECT s.id, s.skill_name
				FROM user_skill us
				JOIN skill s ON s.id = us.skill_id
				WHERE us.user_id = $1
				ORDER BY s.id
			"#,
		)
		.bind(user_id)
		.fetch_all(&self.pool)
		.await?;

		Ok(skills)
	}
}

#[async_trait]
impl ImageStore for PgStore {
	async fn find_image(&self, id: i64) -> Result<Option<Image>> {
		let image = sqlx::query_as::<_, Image>(
			"SELECT id, image_url, blob_key FROM image WHERE id = $1",
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(image)
	}

	async fn insert_image(&self, blob: &StoredBlob) -> Result<Image> {
		let image = sqlx::query_as::<_, Image>(
			r#"
				INSERT INTO image (image_url, blob_key)
				VALUES ($1, $2)
				RETURNING id, image_url, blob_key
			"#,
		)
		.bind(&blob.url)
		.bind(&blob.key)
		.fetch_one(&self.pool)
		.await?;

		Ok(image)
	}

	async fn delete_image(&self, id: i64) -> Result<()> {
		sqlx::query("DELETE FROM image WHERE id = $1 AND id <> $2")
			.bind(id)
			.bind(DEFAULT_PROFILE_IMAGE_ID)
			.execute(&self.pool)
			.await?;

		Ok(())
	}
}

#[async_trait]
impl CategoryStore for PgStore {
	async fn find_category(&self, id: i64) -> Result<Option<Category>> {
		let category = sqlx::query_as::<_, Category>(
			"SELECT id, category_name FROM category WHERE id = $1",
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(category)
	}

	async fn categories(&self) -> Result<Vec<Category>> {
		let categories = sqlx::query_as::<_, Category>(
			"SELECT id, category_name FROM category ORDER BY id",
		)
		.fetch_all(&self.pool)
		.await?;

		Ok(categories)
	}
}

#[async_trait]
impl PostStore for PgStore {
	async fn insert_post(&self, post: NewPost, images: &[StoredBlob]) -> Result<i64> {
		let mut tx = self.pool.begin().await?;

		let id = sqlx::query_scalar::<_, i64>(
			r#"
				INSERT INTO post (user_id, category_id, title, content)
				VALUES ($1, $2, $3, $4)
				RETURNING id
			"#,
		)
		.bind(post.user_id)
		.bind(post.category_id)
		.bind(post.title)
		.bind(post.content)
		.fetch_one(&mut *tx)
		.await?;

		insert_attachments(&mut tx, id, images).await?;

		tx.commit().await?;

		Ok(id)
	}

	async fn find_post(&self, id: i64) -> Result<Option<PostRow>> {
		let post = sqlx::query_as::<_, PostRow>(&format!(
			"{POST_ROW} WHERE p.id = $1 AND NOT p.is_deleted"
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(post)
	}

	async fn list_posts(&self, category_id: i64, order: PostOrder, window: Window) -> Result<Slice<PostRow>> {
		let order = match order {
			PostOrder::Newest => "p.created_at DESC, p.id DESC",
			PostOrder::Likes => "like_count DESC, p.created_at DESC, p.id DESC",
		};

		let items = sqlx::query_as::<_, PostRow>(&format!(
			r#"
				{POST_ROW}
				WHERE p.category_id = $1 AND NOT p.is_deleted
				ORDER BY {order}
				LIMIT $2 OFFSET $3
			"#
		))
		.bind(category_id)
		.bind(window.limit)
		.bind(window.offset)
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>(
			"SELECT COUNT(*) FROM post WHERE category_id = $1 AND NOT is_deleted",
		)
		.bind(category_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(Slice { items, total })
	}

	async fn post_images(&self, post_ids: &[i64]) -> Result<Vec<(i64, Image)>> {
		let rows = sqlx::query_as::<_, (i64, i64, String, Option<String>)>(
			r#"
				SELECT ip.post_id, i.id, i.image_url, i.blob_key
				FROM image_post ip
				JOIN image i ON i.id = ip.image_id
				WHERE ip.post_id = ANY($1)
				ORDER BY ip.id
			"#,
		)
		.bind(post_ids)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.into_iter()
			.map(|(post_id, id, image_url, blob_key)| {
				(
					post_id,
					Image {
						id,
						image_url,
						blob_key,
					},
				)
			})
			.collect())
	}

	async fn increment_view(&self, id: i64) -> Result<Option<i32>> {
		let view = sqlx::query_scalar::<_, i32>(
			"UPDATE post SET view = view + 1 WHERE id = $1 AND NOT is_deleted RETURNING view",
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(view)
	}

	async fn update_post(&self, id: i64, author_id: i64, changes: PostChanges) -> Result<Option<Vec<Image>>> {
		let mut tx = self.pool.begin().await?;

		let updated = sqlx::query_scalar::<_, i64>(
			r#"
				UPDATE post
				SET title = $1, content = $2
				WHERE id = $3 AND user_id = $4 AND NOT is_deleted
				RETURNING id
			"#,
		)
		.bind(changes.title)
		.bind(changes.content)
		.bind(id)
		.bind(author_id)
		.fetch_optional(&mut *tx)
		.await?;

		if updated.is_none() {
			return Ok(None);
		}

		let Some(images) = changes.images else {
			tx.commit().await?;

			return Ok(Some(Vec::new()));
		};

		let detached = sqlx::query_as::<_, Image>(
			r#"
				SELECT i.id, i.image_url, i.blob_key
				FROM image_post ip
				JOIN image i ON i.id = ip.image_id
				WHERE ip.post_id = $1
				ORDER BY ip.id
			"#,
		)
		.bind(id)
		.fetch_all(&mut *tx)
		.await?;

		let detached_ids = detached.iter().map(|image| image.id).collect::<Vec<_>>();

		sqlx::query("DELETE FROM image_post WHERE post_id = $1")
			.bind(id)
			.execute(&mut *tx)
			.await?;

		sqlx::query("DELETE FROM image WHERE id = ANY($1) AND id <> $2")
			.bind(&detached_ids[..])
			.bind(DEFAULT_PROFILE_IMAGE_ID)
			.execute(&mut *tx)
			.await?;

		insert_attachments(&mut tx, id, &images).await?;

		tx.commit().await?;

		Ok(Some(detached))
	}

	async fn soft_delete_post(&self, id: i64, author_id: i64) -> Result<bool> {
		let result = sqlx::query(
			"UPDATE post SET is_deleted = TRUE WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
		)
		.bind(id)
		.bind(author_id)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn authored_posts(&self, user_id: i64, category_id: i64, window: Window) -> Result<Slice<MyPagePostRow>> {
		let items = sqlx::query_as::<_, MyPagePostRow>(&format!(
			r#"
				{MY_PAGE_ROW}
				WHERE p.user_id = $1 AND p.category_id = $2 AND NOT p.is_deleted
				ORDER BY p.created_at DESC, p.id DESC
				LIMIT $3 OFFSET $4
			"#
		))
		.bind(user_id)
		.bind(category_id)
		.bind(window.limit)
		.bind(window.offset)
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>(
			"SELECT COUNT(*) FROM post WHERE user_id = $1 AND category_id = $2 AND NOT is_deleted",
		)
		.bind(user_id)
		.bind(category_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(Slice { items, total })
	}
}

#[async_trait]
impl LikeStore for PgStore {
	async fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<Option<(LikeStatus, i64)>> {
		let mut tx = self.pool.begin().await?;

		// toggles on the same post serialize on this row lock
		let post = sqlx::query_scalar::<_, i64>(
			"SELECT id FROM post WHERE id = $1 AND NOT is_deleted FOR UPDATE",
		)
		.bind(post_id)
		.fetch_optional(&mut *tx)
		.await?;

		if post.is_none() {
			return Ok(None);
		}

		let removed = sqlx::query("DELETE FROM post_like WHERE user_id = $1 AND post_id = $2")
			.bind(user_id)
			.bind(post_id)
			.execute(&mut *tx)
			.await?
			.rows_affected();

		let status = if removed > 0 {
			LikeStatus::Unliked
		} else {
			sqlx::query("INSERT INTO post_like (user_id, post_id) VALUES ($1, $2)")
				.bind(user_id)
				.bind(post_id)
				.execute(&mut *tx)
				.await?;

			LikeStatus::Liked
		};

		let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_like WHERE post_id = $1")
			.bind(post_id)
			.fetch_one(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(Some((status, count)))
	}

	async fn liked_posts(&self, user_id: i64, window: Window) -> Result<Slice<MyPagePostRow>> {
		let items = sqlx::query_as::<_, MyPagePostRow>(&format!(
			r#"
				{MY_PAGE_ROW}
				JOIN post_like pl ON pl.post_id = p.id AND pl.user_id = $1
				WHERE NOT p.is_deleted
				ORDER BY pl.created_at DESC, p.id DESC
				LIMIT $2 OFFSET $3
			"#
		))
		.bind(user_id)
		.bind(window.limit)
		.bind(window.offset)
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>(
			r#"
				SELECT COUNT(*)
				FROM post_like pl
				JOIN post p ON p.id = pl.post_id
				WHERE pl.user_id = $1 AND NOT p.is_deleted
			"#,
		)
		.bind(user_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(Slice { items, total })
	}
}

#[async_trait]
impl ReplyStore for PgStore {
	async fn insert_reply(&self, post_id: i64, user_id: i64, content: &str) -> Result<Option<i64>> {
		let id = sqlx::query_scalar::<_, i64>(
			r#"
				INSERT INTO reply (post_id, user_id, content)
				SELECT id, $2, $3 FROM post
				WHERE id = $1 AND NOT is_deleted
				RETURNING id
			"#,
		)
		.bind(post_id)
		.bind(user_id)
		.bind(content)
		.fetch_optional(&self.pool)
		.await?;

		Ok(id)
	}

	async fn replied_posts(&self, user_id: i64, window: Window) -> Result<Slice<MyPagePostRow>> {
		let items = sqlx::query_as::<_, MyPagePostRow>(&format!(
			r#"
				{MY_PAGE_ROW}
				JOIN (
					SELECT post_id, MAX(id) AS last_reply
					FROM reply
					WHERE user_id = $1
					GROUP BY post_id
				) lr ON lr.post_id = p.id
				WHERE NOT p.is_deleted
				ORDER BY lr.last_reply DESC
				LIMIT $2 OFFSET $3
			"#
		))
		.bind(user_id)
		.bind(window.limit)
		.bind(window.offset)
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>(
			r#"
				SELECT COUNT(DISTINCT r.post_id)
				FROM reply r
				JOIN post p ON p.id = r.post_id
				WHERE r.user_id = $1 AND NOT p.is_deleted
			"#,
		)
		.bind(user_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(Slice { items, total })
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn blob(key: &str) -> StoredBlob {
		StoredBlob {
			url: format!("http://localhost:3000/uploads/{key}"),
			key: key.into(),
		}
	}

	async fn user(store: &PgStore, email: &str, nickname: &str, phone: &str) -> i64 {
		store
			.insert_user(NewUser {
				email: email.into(),
				password: "hash".into(),
				name: "Tester".into(),
				nickname: nickname.into(),
				phone: phone.into(),
				image_id: DEFAULT_PROFILE_IMAGE_ID,
			})
			.await
			.unwrap()
	}

	fn post(user_id: i64) -> NewPost {
		NewPost {
			user_id,
			category_id: 1,
			title: "hello".into(),
			content: "world".into(),
		}
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_duplicate_email_is_a_conflict(pool: PgPool) {
		let store = PgStore::new(pool);

		user(&store, "a@x.com", "nick", "01012345678").await;

		let error = store
			.insert_user(NewUser {
				email: "a@x.com".into(),
				password: "hash".into(),
				name: "Other".into(),
				nickname: "other".into(),
				phone: "01087654321".into(),
				image_id: DEFAULT_PROFILE_IMAGE_ID,
			})
			.await
			.unwrap_err();

		assert!(matches!(error, Error::Conflict(index) if index == "user_email_key"));
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_soft_deleted_user_frees_email(pool: PgPool) {
		let store = PgStore::new(pool);
		let first = user(&store, "a@x.com", "nick", "01012345678").await;

		store.soft_delete_user(first).await.unwrap();

		let second = user(&store, "a@x.com", "nick", "01012345678").await;
		let found = store.find_user_by_email("a@x.com").await.unwrap().unwrap();

		assert_eq!(found.id, second);
		assert!(!store.user_exists(UniqueField::Phone, "01000000000").await.unwrap());
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_like_toggle_parity(pool: PgPool) {
		let store = PgStore::new(pool);
		let author = user(&store, "a@x.com", "nick", "01012345678").await;
		let post_id = store.insert_post(post(author), &[]).await.unwrap();

		let tasks = (0..5).map(|_| {
			let store = store.clone();
			tokio::spawn(async move { store.toggle_like(author, post_id).await })
		});

		for task in tasks.collect::<Vec<_>>() {
			task.await.unwrap().unwrap().unwrap();
		}

		let (status, count) = store.toggle_like(author, post_id).await.unwrap().unwrap();

		// five concurrent toggles leave one like, the sixth removes it
		assert_eq!(status, LikeStatus::Unliked);
		assert_eq!(count, 0);
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_update_replaces_attachments(pool: PgPool) {
		let store = PgStore::new(pool);
		let author = user(&store, "a@x.com", "nick", "01012345678").await;
		let post_id = store
			.insert_post(post(author), &[blob("images/x.png"), blob("images/y.png")])
			.await
			.unwrap();

		let detached = store
			.update_post(
				post_id,
				author,
				PostChanges {
					title: "edited".into(),
					content: "body".into(),
					images: Some(vec![blob("images/a.png")]),
				},
			)
			.await
			.unwrap()
			.unwrap();

		assert_eq!(detached.len(), 2);
		for image in &detached {
			assert!(store.find_image(image.id).await.unwrap().is_none());
		}

		let images = store.post_images(&[post_id]).await.unwrap();

		assert_eq!(images.len(), 1);
		assert_eq!(images[0].1.blob_key.as_deref(), Some("images/a.png"));
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_update_profile_returns_replaced_image(pool: PgPool) {
		let store = PgStore::new(pool);
		let id = user(&store, "a@x.com", "nick", "01012345678").await;
		let first = store.insert_image(&blob("images/a.png")).await.unwrap();
		let second = store.insert_image(&blob("images/b.png")).await.unwrap();

		let changes = |image_id| ProfileChanges {
			name: "Tester".into(),
			nickname: "nick".into(),
			phone: "01012345678".into(),
			skill_ids: Vec::new(),
			image_id,
		};

		let replaced = store.update_profile(id, changes(Some(first.id))).await.unwrap();
		assert_eq!(replaced, Some(DEFAULT_PROFILE_IMAGE_ID));

		let replaced = store.update_profile(id, changes(Some(second.id))).await.unwrap();
		assert_eq!(replaced, Some(first.id));

		assert_eq!(store.update_profile(id, changes(None)).await.unwrap(), None);
		assert_eq!(store.update_profile(id, changes(Some(second.id))).await.unwrap(), None);
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_deleted_post_is_invisible(pool: PgPool) {
		let store = PgStore::new(pool);
		let author = user(&store, "a@x.com", "nick", "01012345678").await;
		let post_id = store.insert_post(post(author), &[]).await.unwrap();

		assert!(store.soft_delete_post(post_id, author).await.unwrap());
		assert!(store.find_post(post_id).await.unwrap().is_none());
		assert!(store.increment_view(post_id).await.unwrap().is_none());
		assert!(store.toggle_like(author, post_id).await.unwrap().is_none());

		let listed = store
			.list_posts(1, PostOrder::Newest, Window { offset: 0, limit: 10 })
			.await
			.unwrap();

		assert_eq!(listed.total, 0);
		assert!(listed.items.is_empty());
	}

	#[sqlx::test]
	#[ignore = "requires a postgres database"]
	async fn test_default_image_is_never_deleted(pool: PgPool) {
		let store = PgStore::new(pool);

		store.delete_image(DEFAULT_PROFILE_IMAGE_ID).await.unwrap();

		assert!(store
			.find_image(DEFAULT_PROFILE_IMAGE_ID)
			.await
			.unwrap()
			.is_some());
	}
}
