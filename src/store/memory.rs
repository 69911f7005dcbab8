use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::blob::StoredBlob;

use super::{
	Category, CategoryStore, Error, Image, ImageStore, LikeStatus, LikeStore, MyPagePostRow,
	NewPost, NewUser, Post, PostChanges, PostOrder, PostRow, PostStore, ProfileChanges,
	ReplyStore, Result, Skill, SkillStore, Slice, UniqueField, User, UserStore, Window,
	DEFAULT_PROFILE_IMAGE_ID,
};

const DEFAULT_PROFILE_IMAGE_URL: &str = "https://static.community-api.dev/default-profile.png";
const CATEGORIES: [&str; 3] = ["CM_TEAM", "CM_PERSONAL", "CM_LOUNGE"];
const SKILLS: [&str; 16] = [
	"Java",
	"Spring",
	"JavaScript",
	"TypeScript",
	"React",
	"Vue",
	"Node.js",
	"Python",
	"Django",
	"Rust",
	"Go",
	"Kotlin",
	"Swift",
	"Flutter",
	"AWS",
	"Docker",
];

#[derive(Debug)]
struct Attachment {
	id: i64,
	post_id: i64,
	image_id: i64,
}

#[derive(Debug)]
struct Like {
	user_id: i64,
	post_id: i64,
	/// Insertion order, newest is largest.
	seq: i64,
}

#[derive(Debug)]
struct Reply {
	post_id: i64,
	user_id: i64,
	content: String,
	seq: i64,
}

#[derive(Debug, Default)]
struct Tables {
	last_id: i64,
	users: BTreeMap<i64, User>,
	images: BTreeMap<i64, Image>,
	categories: BTreeMap<i64, Category>,
	skills: BTreeMap<i64, Skill>,
	user_skills: BTreeSet<(i64, i64)>,
	posts: BTreeMap<i64, Post>,
	attachments: Vec<Attachment>,
	likes: Vec<Like>,
	replies: BTreeMap<i64, Reply>,
}

impl Tables {
	/// Row ids, shared by every table that grows at runtime.
	fn next_id(&mut self) -> i64 {
		self.last_id += 1;
		self.last_id
	}

	fn visible_post(&self, id: i64) -> Option<&Post> {
		self.posts.get(&id).filter(|post| !post.is_deleted)
	}

	fn like_count(&self, post_id: i64) -> i64 {
		self.likes.iter().filter(|like| like.post_id == post_id).count() as i64
	}

	fn post_row(&self, post: &Post) -> PostRow {
		PostRow {
			id: post.id,
			user_id: post.user_id,
			nickname: self
				.users
				.get(&post.user_id)
				.map(|user| user.nickname.clone())
				.unwrap_or_default(),
			category_id: post.category_id,
			title: post.title.clone(),
			content: post.content.clone(),
			view: post.view,
			like_count: self.like_count(post.id),
			created_at: post.created_at,
		}
	}

	fn my_page_row(&self, post: &Post, viewer: i64) -> MyPagePostRow {
		MyPagePostRow {
			id: post.id,
			category_id: post.category_id,
			title: post.title.clone(),
			view: post.view,
			like_count: self.like_count(post.id),
			reply_count: self
				.replies
				.values()
				.filter(|reply| reply.post_id == post.id)
				.count() as i64,
			liked: self
				.likes
				.iter()
				.any(|like| like.post_id == post.id && like.user_id == viewer),
			replied: self
				.replies
				.values()
				.any(|reply| reply.post_id == post.id && reply.user_id == viewer),
			created_at: post.created_at,
		}
	}

	fn active_user_with(&self, field: UniqueField, value: &str) -> bool {
		self.users.values().filter(|user| !user.is_deleted).any(|user| match field {
			UniqueField::Email => user.email == value,
			UniqueField::Nickname => user.nickname == value,
			UniqueField::Phone => user.phone == value,
		})
	}

	/// Mirrors the partial unique indexes of the relational schema.
	fn check_unique(&self, id: Option<i64>, email: &str, nickname: &str, phone: &str) -> Result<()> {
		let others = || {
			self.users
				.values()
				.filter(move |user| !user.is_deleted && Some(user.id) != id)
		};

		if others().any(|user| user.email == email) {
			return Err(Error::Conflict("user_email_key".into()));
		}
		if others().any(|user| user.nickname == nickname) {
			return Err(Error::Conflict("user_nickname_key".into()));
		}
		if others().any(|user| user.phone == phone) {
			return Err(Error::Conflict("user_phone_key".into()));
		}

		Ok(())
	}

	fn insert_image(&mut self, blob: &StoredBlob) -> Image {
		let image = Image {
			id: self.next_id(),
			image_url: blob.url.clone(),
			blob_key: Some(blob.key.clone()),
		};

		self.images.insert(image.id, image.clone());
		image
	}

	fn attach(&mut self, post_id: i64, images: &[StoredBlob]) {
		for blob in images {
			let image = self.insert_image(blob);
			let id = self.next_id();

			self.attachments.push(Attachment {
				id,
				post_id,
				image_id: image.id,
			});
		}
	}
}

fn window<T>(items: Vec<T>, window: Window) -> Slice<T> {
	let total = items.len() as i64;
	let items = items
		.into_iter()
		.skip(usize::try_from(window.offset).unwrap_or(0))
		.take(usize::try_from(window.limit).unwrap_or(0))
		.collect();

	Slice { items, total }
}

fn newest_first(a: (DateTime<Utc>, i64), b: (DateTime<Utc>, i64)) -> std::cmp::Ordering {
	b.cmp(&a)
}

/// A process-local store seeded like a freshly migrated database.
#[derive(Debug)]
pub struct MemoryStore {
	tables: Mutex<Tables>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStore {
	pub fn new() -> Self {
		let mut tables = Tables::default();

		tables.images.insert(
			DEFAULT_PROFILE_IMAGE_ID,
			Image {
				id: DEFAULT_PROFILE_IMAGE_ID,
				image_url: DEFAULT_PROFILE_IMAGE_URL.into(),
				blob_key: None,
			},
		);
		tables.last_id = DEFAULT_PROFILE_IMAGE_ID;

		// same ids as the seed migration
		for (id, name) in (1..).zip(CATEGORIES) {
			tables.categories.insert(
				id,
				Category {
					id,
					category_name: name.into(),
				},
			);
		}

		for (id, name) in (1..).zip(SKILLS) {
			tables.skills.insert(
				id,
				Skill {
					id,
					skill_name: name.into(),
				},
			);
		}

		Self {
			tables: Mutex::new(tables),
		}
	}

	/// Drops the seeded default profile image, which `delete_image` never does.
	#[cfg(test)]
	pub fn remove_default_image(&self) {
		self.tables.lock().images.remove(&DEFAULT_PROFILE_IMAGE_ID);
	}
}

#[async_trait]
impl UserStore for MemoryStore {
	async fn user_exists(&self, field: UniqueField, value: &str) -> Result<bool> {
		Ok(self.tables.lock().active_user_with(field, value))
	}

	async fn insert_user(&self, user: NewUser) -> Result<i64> {
		let mut tables = self.tables.lock();

		tables.check_unique(None, &user.email, &user.nickname, &user.phone)?;

		let id = tables.next_id();
		tables.users.insert(
			id,
			User {
				id,
				email: user.email,
				password: user.password,
				name: user.name,
				nickname: user.nickname,
				phone: user.phone,
				image_id: user.image_id,
				is_deleted: false,
				created_at: Utc::now(),
			},
		);

		Ok(id)
	}

	async fn find_user(&self, id: i64) -> Result<Option<User>> {
		Ok(self.tables.lock().users.get(&id).cloned())
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
		let tables = self.tables.lock();

		// an active account wins over deleted ones with the same email
		Ok(tables
			.users
			.values()
			.filter(|user| user.email == email)
			.min_by_key(|user| (user.is_deleted, std::cmp::Reverse(user.id)))
			.cloned())
	}

	async fn find_user_by_email_and_name(&self, email: &str, name: &str) -> Result<Option<User>> {
		Ok(self
			.tables
			.lock()
			.users
			.values()
			.find(|user| !user.is_deleted && user.email == email && user.name == name)
			.cloned())
	}

	async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<i64>> {
		let mut tables = self.tables.lock();

		let Some(email) = tables.users.get(&id).map(|user| user.email.clone()) else {
			return Ok(None);
		};

		tables.check_unique(Some(id), &email, &changes.nickname, &changes.phone)?;

		let mut replaced = None;

		if let Some(user) = tables.users.get_mut(&id) {
			user.name = changes.name;
			user.nickname = changes.nickname;
			user.phone = changes.phone;

			if let Some(image_id) = changes.image_id {
				if user.image_id != image_id {
					replaced = Some(user.image_id);
				}
				user.image_id = image_id;
			}
		}

		tables
			.user_skills
			.retain(|(user_id, skill_id)| *user_id != id || changes.skill_ids.contains(skill_id));

		for skill_id in changes.skill_ids {
			tables.user_skills.insert((id, skill_id));
		}

		Ok(replaced)
	}

	async fn update_password(&self, id: i64, password: &str) -> Result<()> {
		if let Some(user) = self.tables.lock().users.get_mut(&id) {
			user.password = password.to_owned();
		}

		Ok(())
	}

	async fn soft_delete_user(&self, id: i64) -> Result<()> {
		if let Some(user) = self.tables.lock().users.get_mut(&id) {
			user.is_deleted = true;
		}

		Ok(())
	}
}

#[async_trait]
impl SkillStore for MemoryStore {
	async fn find_skills_by_name(&self, names: &[String]) -> Result<Vec<Skill>> {
		Ok(self
			.tables
			.lock()
			.skills
			.values()
			.filter(|skill| names.contains(&skill.skill_name))
			.cloned()
			.collect())
	}

	async fn user_skills(&self, user_id: i64) -> Result<Vec<Skill>> {
		let tables = self.tables.lock();

		Ok(tables
			.user_skills
			.iter()
			.filter(|(id, _)| *id == user_id)
			.filter_map(|(_, skill_id)| tables.skills.get(skill_id).cloned())
			.collect())
	}
}

#[async_trait]
impl ImageStore for MemoryStore {
	async fn find_image(&self, id: i64) -> Result<Option<Image>> {
		Ok(self.tables.lock().images.get(&id).cloned())
	}

	async fn insert_image(&self, blob: &StoredBlob) -> Result<Image> {
		Ok(self.tables.lock().insert_image(blob))
	}

	async fn delete_image(&self, id: i64) -> Result<()> {
		if id != DEFAULT_PROFILE_IMAGE_ID {
			self.tables.lock().images.remove(&id);
		}

		Ok(())
	}
}

#[async_trait]
impl CategoryStore for MemoryStore {
	async fn find_category(&self, id: i64) -> Result<Option<Category>> {
		Ok(self.tables.lock().categories.get(&id).cloned())
	}

	async fn categories(&self) -> Result<Vec<Category>> {
		Ok(self.tables.lock().categories.values().cloned().collect())
	}
}

#[async_trait]
impl PostStore for MemoryStore {
	async fn insert_post(&self, post: NewPost, images: &[StoredBlob]) -> Result<i64> {
		let mut tables = self.tables.lock();
		let id = tables.next_id();

		tables.posts.insert(
			id,
			Post {
				id,
				user_id: post.user_id,
				category_id: post.category_id,
				title: post.title,
				content: post.content,
				view: 0,
				is_deleted: false,
				created_at: Utc::now(),
			},
		);
		tables.attach(id, images);

		Ok(id)
	}

	async fn find_post(&self, id: i64) -> Result<Option<PostRow>> {
		let tables = self.tables.lock();

		Ok(tables.visible_post(id).map(|post| tables.post_row(post)))
	}

	async fn list_posts(&self, category_id: i64, order: PostOrder, window: Window) -> Result<Slice<PostRow>> {
		let tables = self.tables.lock();

		let mut rows = tables
			.posts
			.values()
			.filter(|post| !post.is_deleted && post.category_id == category_id)
			.map(|post| tables.post_row(post))
			.collect::<Vec<_>>();

		rows.sort_by(|a, b| {
			let by_time = newest_first((a.created_at, a.id), (b.created_at, b.id));

			match order {
				PostOrder::Newest => by_time,
				PostOrder::Likes => b.like_count.cmp(&a.like_count).then(by_time),
			}
		});

		Ok(self::window(rows, window))
	}

	async fn post_images(&self, post_ids: &[i64]) -> Result<Vec<(i64, Image)>> {
		let tables = self.tables.lock();

		Ok(tables
			.attachments
			.iter()
			.filter(|attachment| post_ids.contains(&attachment.post_id))
			.filter_map(|attachment| {
				tables
					.images
					.get(&attachment.image_id)
					.map(|image| (attachment.post_id, image.clone()))
			})
			.collect())
	}

	async fn increment_view(&self, id: i64) -> Result<Option<i32>> {
		let mut tables = self.tables.lock();

		Ok(tables
			.posts
			.get_mut(&id)
			.filter(|post| !post.is_deleted)
			.map(|post| {
				post.view += 1;
				post.view
			}))
	}

	async fn update_post(&self, id: i64, author_id: i64, changes: PostChanges) -> Result<Option<Vec<Image>>> {
		let mut tables = self.tables.lock();

		let Some(post) = tables
			.posts
			.get_mut(&id)
			.filter(|post| !post.is_deleted && post.user_id == author_id)
		else {
			return Ok(None);
		};

		post.title = changes.title;
		post.content = changes.content;

		let Some(images) = changes.images else {
			return Ok(Some(Vec::new()));
		};

		let (detached, kept) = std::mem::take(&mut tables.attachments)
			.into_iter()
			.partition::<Vec<_>, _>(|attachment| attachment.post_id == id);

		tables.attachments = kept;

		let detached = detached
			.iter()
			.filter(|attachment| attachment.image_id != DEFAULT_PROFILE_IMAGE_ID)
			.filter_map(|attachment| tables.images.remove(&attachment.image_id))
			.collect();

		tables.attach(id, &images);

		Ok(Some(detached))
	}

	async fn soft_delete_post(&self, id: i64, author_id: i64) -> Result<bool> {
		let mut tables = self.tables.lock();

		Ok(tables
			.posts
			.get_mut(&id)
			.filter(|post| !post.is_deleted && post.user_id == author_id)
			.map(|post| post.is_deleted = true)
			.is_some())
	}

	async fn authored_posts(&self, user_id: i64, category_id: i64, window: Window) -> Result<Slice<MyPagePostRow>> {
		let tables = self.tables.lock();

		let mut posts = tables
			.posts
			.values()
			.filter(|post| !post.is_deleted && post.user_id == user_id && post.category_id == category_id)
			.collect::<Vec<_>>();

		posts.sort_by(|a, b| newest_first((a.created_at, a.id), (b.created_at, b.id)));

		let rows = posts
			.into_iter()
			.map(|post| tables.my_page_row(post, user_id))
			.collect();

		Ok(self::window(rows, window))
	}
}

#[async_trait]
impl LikeStore for MemoryStore {
	async fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<Option<(LikeStatus, i64)>> {
		let mut tables = self.tables.lock();

		if tables.visible_post(post_id).is_none() {
			return Ok(None);
		}

		let before = tables.likes.len();
		tables
			.likes
			.retain(|like| !(like.user_id == user_id && like.post_id == post_id));

		let status = if tables.likes.len() < before {
			LikeStatus::Unliked
		} else {
			let seq = tables.next_id();
			tables.likes.push(Like {
				user_id,
				post_id,
				seq,
			});

			LikeStatus::Liked
		};

		Ok(Some((status, tables.like_count(post_id))))
	}

	async fn liked_posts(&self, user_id: i64, window: Window) -> Result<Slice<MyPagePostRow>> {
		let tables = self.tables.lock();

		let mut likes = tables
			.likes
			.iter()
			.filter(|like| like.user_id == user_id)
			.collect::<Vec<_>>();

		likes.sort_by(|a, b| b.seq.cmp(&a.seq));

		let rows = likes
			.into_iter()
			.filter_map(|like| tables.visible_post(like.post_id))
			.map(|post| tables.my_page_row(post, user_id))
			.collect();

		Ok(self::window(rows, window))
	}
}

#[async_trait]
impl ReplyStore for MemoryStore {
	async fn insert_reply(&self, post_id: i64, user_id: i64, content: &str) -> Result<Option<i64>> {
		let mut tables = self.tables.lock();

		if tables.visible_post(post_id).is_none() {
			return Ok(None);
		}

		let id = tables.next_id();
		tables.replies.insert(
			id,
			Reply {
				post_id,
				user_id,
				content: content.to_owned(),
				seq: id,
			},
		);

		Ok(Some(id))
	}

	async fn replied_posts(&self, user_id: i64, window: Window) -> Result<Slice<MyPagePostRow>> {
		let tables = self.tables.lock();

		// latest reply per post
		let mut latest = BTreeMap::<i64, i64>::new();
		for reply in tables.replies.values().filter(|reply| reply.user_id == user_id) {
			let seq = latest.entry(reply.post_id).or_insert(reply.seq);
			*seq = (*seq).max(reply.seq);
		}

		let mut posts = latest.into_iter().collect::<Vec<_>>();
		posts.sort_by(|a, b| b.1.cmp(&a.1));

		let rows = posts
			.into_iter()
			.filter_map(|(post_id, _)| tables.visible_post(post_id))
			.map(|post| tables.my_page_row(post, user_id))
			.collect();

		Ok(self::window(rows, window))
	}
}
