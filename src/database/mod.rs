use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    oneshot,
};

pub mod models;
mod queries;

use models::{Board, FeedPage, FeedScope, PostView, ProfileView, SortKey, UserDetail, PAGE_SIZE};

macro_rules! generate_executor {
    ($($task:ident / $fn:ident, ($db:ident, $($arg:ident: $ty:ty),*) => $ret:ty $handler:block)*) => {
        #[derive(Clone)]
        pub struct ExecutorConnection(UnboundedSender<Task>);

        #[derive(Debug)]
        enum Task {
            $($task{tx:oneshot::Sender<$ret>,$($arg:$ty,)*}),*
        }

        impl ExecutorConnection {
            $(pub async fn $fn(&self, $($arg: $ty),*) -> $ret {
                let (tx, rx) = oneshot::channel();
                self.0.send(Task::$task{tx,$($arg),*}).unwrap();
                rx.await.unwrap()
            })*
        }

        pub struct DbExecutor {
            rx: UnboundedReceiver<Task>,
            db: rusqlite::Connection,
        }

        impl DbExecutor {
            pub fn create(dbpath: &str) -> rusqlite::Result<(Self, ExecutorConnection)> {
                let (tx, rx) = unbounded_channel();
                let db = rusqlite::Connection::open(dbpath)?;
                db.pragma_update(None, "foreign_keys", true)?;
                db.execute_batch(include_str!("schema.sql"))?;
                tracing::info!("Database connected ({})", dbpath);
                Ok((Self { rx, db }, ExecutorConnection(tx)))
            }

            pub fn run(mut self) {
                while let Some(task) = self.rx.blocking_recv() {
                    let before = Instant::now();
                    tracing::debug!("received task {:?}", task);
                    match task {
                        $(Task::$task{tx,$($arg),*} => {
                            let $db = &mut self.db;
                            let _e = tx.send((||$handler)());
                        })*
                    }
                    tracing::debug!("task took {}ms", Instant::now().duration_since(before).as_millis());
                }
            }
        }
    };
}

fn post_from_row(row: &rusqlite::Row) -> rusqlite::Result<PostView> {
    Ok(PostView {
        id: row.get(0)?,
        author: row.get(1)?,
        board_id: row.get(2)?,
        board: row.get(3)?,
        parent: row.get(4)?,
        content: row.get(5)?,
        image_link: row.get(6)?,
        time: row.get(7)?,
        num_likes: row.get(8)?,
        num_comments: row.get(9)?,
    })
}

fn board_from_row(row: &rusqlite::Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        thumbnail: row.get(3)?,
    })
}

generate_executor! {
    CreateUser / create_user, (db, username: String, email: String, password_hash: String) => rusqlite::Result<i64> {
        let mut stmt = db.prepare_cached(queries::INSERT_USER)?;
        stmt.execute(params![username, email, password_hash, Utc::now().timestamp()])?;
        Ok(db.last_insert_rowid())
    }
    UserCred / user_cred, (db, username: String) => rusqlite::Result<Option<(i64, String)>> {
        let mut stmt = db.prepare_cached(queries::SELECT_USER_CRED)?;
        stmt.query_row(params![username], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()
    }
    UserId / user_id, (db, username: String) => rusqlite::Result<Option<i64>> {
        let mut stmt = db.prepare_cached(queries::SELECT_USER_ID)?;
        stmt.query_row(params![username], |row| row.get(0)).optional()
    }
    GetBoards / get_boards, (db,) => rusqlite::Result<Vec<Board>> {
        let mut stmt = db.prepare_cached(queries::SELECT_BOARDS)?;
        let boards = stmt.query_map([], board_from_row)?.collect();
        boards
    }
    CreateBoard / create_board, (db, name: String, description: String, thumbnail: Option<String>) => rusqlite::Result<i64> {
        let mut stmt = db.prepare_cached(queries::INSERT_BOARD)?;
        stmt.execute(params![name, description, thumbnail])?;
        Ok(db.last_insert_rowid())
    }
    GetBoard / get_board, (db, id: i64) => rusqlite::Result<Option<Board>> {
        let mut stmt = db.prepare_cached(queries::SELECT_BOARD)?;
        stmt.query_row(params![id], board_from_row).optional()
    }
    CreatePost / create_post, (db, board: i64, author: i64, content: String, image_link: String) => rusqlite::Result<i64> {
        let mut stmt = db.prepare_cached(queries::INSERT_POST)?;
        stmt.execute(params![board, author, None::<i64>, content, image_link, Utc::now().timestamp()])?;
        Ok(db.last_insert_rowid())
    }
    GetPost / get_post, (db, id: i64) => rusqlite::Result<Option<PostView>> {
        let sql = format!("{} where p.id = ?", queries::SELECT_POST_BASE);
        let mut stmt = db.prepare_cached(&sql)?;
        stmt.query_row(params![id], post_from_row).optional()
    }
    UpdatePost / update_post, (db, id: i64, content: Option<String>, image_link: Option<String>) => rusqlite::Result<bool> {
        let changed = match (content, image_link) {
            (Some(c), Some(i)) => db.prepare_cached(queries::UPDATE_POST_BOTH)?.execute(params![c, i, id])?,
            (Some(c), None) => db.prepare_cached(queries::UPDATE_POST_CONTENT)?.execute(params![c, id])?,
            (None, Some(i)) => db.prepare_cached(queries::UPDATE_POST_IMAGE)?.execute(params![i, id])?,
            (None, None) => {
                let mut stmt = db.prepare_cached(queries::CHECK_POST)?;
                return Ok(stmt.exists(params![id])?);
            }
        };
        Ok(changed > 0)
    }
    CreateComment / create_comment, (db, parent: i64, author: i64, content: String, image_link: String) => rusqlite::Result<Option<PostView>> {
        let tx = db.transaction()?;
        let board: Option<i64> = tx
            .prepare_cached(queries::SELECT_PARENT_BOARD)?
            .query_row(params![parent], |row| row.get(0))
            .optional()?;
        let Some(board) = board else { return Ok(None) };
        tx.prepare_cached(queries::INSERT_POST)?
            .execute(params![board, author, Some(parent), content, image_link, Utc::now().timestamp()])?;
        let id = tx.last_insert_rowid();
        let sql = format!("{} where p.id = ?", queries::SELECT_POST_BASE);
        let comment = tx.prepare_cached(&sql)?.query_row(params![id], post_from_row)?;
        tx.commit()?;
        Ok(Some(comment))
    }
    GetComments / get_comments, (db, parent: i64) => rusqlite::Result<Vec<PostView>> {
        let sql = format!(
            "{} where p.parent = ? order by p.time desc, p.id desc",
            queries::SELECT_POST_BASE
        );
        let mut stmt = db.prepare_cached(&sql)?;
        let comments = stmt.query_map(params![parent], post_from_row)?.collect();
        comments
    }
    ListPosts / list_posts, (db, scope: FeedScope, sort: SortKey, page: usize) => rusqlite::Result<FeedPage> {
        let count_sql = format!("{}{}", queries::COUNT_FEED, scope.where_clause());
        let total = db
            .prepare_cached(&count_sql)?
            .query_row(params![scope.param()], |row| row.get::<_, i64>(0))? as usize;
        let num_pages = total.div_ceil(PAGE_SIZE).max(1);
        let page = page.clamp(1, num_pages);
        let sql = format!(
            "{} where p.parent is null and {} order by {} limit ?2 offset ?3",
            queries::SELECT_POST_BASE,
            scope.where_clause(),
            sort.order_clause()
        );
        let mut stmt = db.prepare_cached(&sql)?;
        let posts = stmt
            .query_map(
                params![scope.param(), PAGE_SIZE as i64, ((page - 1) * PAGE_SIZE) as i64],
                post_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(FeedPage { posts, page, num_pages, total })
    }
    ToggleFollow / toggle_follow, (db, follower: i64, followed: i64) => rusqlite::Result<Option<bool>> {
        if follower == followed {
            return Ok(None);
        }
        let tx = db.transaction()?;
        let removed = tx.prepare_cached(queries::DELETE_FOLLOW)?.execute(params![follower, followed])?;
        if removed == 0 {
            tx.prepare_cached(queries::INSERT_FOLLOW)?.execute(params![follower, followed])?;
        }
        tx.commit()?;
        Ok(Some(removed == 0))
    }
    ToggleLike / toggle_like, (db, user: i64, post: i64) => rusqlite::Result<Option<bool>> {
        let tx = db.transaction()?;
        if !tx.prepare_cached(queries::CHECK_POST)?.exists(params![post])? {
            return Ok(None);
        }
        let removed = tx.prepare_cached(queries::DELETE_LIKE)?.execute(params![user, post])?;
        if removed == 0 {
            tx.prepare_cached(queries::INSERT_LIKE)?.execute(params![user, post])?;
        }
        tx.commit()?;
        Ok(Some(removed == 0))
    }
    GetProfile / get_profile, (db, username: String, viewer: Option<i64>) => rusqlite::Result<Option<ProfileView>> {
        let id: Option<i64> = db
            .prepare_cached(queries::SELECT_USER_ID)?
            .query_row(params![username], |row| row.get(0))
            .optional()?;
        let Some(id) = id else { return Ok(None) };
        let followers = db
            .prepare_cached(queries::COUNT_FOLLOWERS)?
            .query_row(params![id], |row| row.get(0))?;
        let following = db
            .prepare_cached(queries::COUNT_FOLLOWING)?
            .query_row(params![id], |row| row.get(0))?;
        let viewer_follows = match viewer {
            Some(viewer) => db.prepare_cached(queries::CHECK_FOLLOW)?.exists(params![viewer, id])?,
            None => false,
        };
        Ok(Some(ProfileView { id, username, followers, following, viewer_follows }))
    }
    GetUserDetail / user_detail, (db, username: String) => rusqlite::Result<Option<UserDetail>> {
        let id: Option<i64> = db
            .prepare_cached(queries::SELECT_USER_ID)?
            .query_row(params![username], |row| row.get(0))
            .optional()?;
        let Some(id) = id else { return Ok(None) };
        let following = db
            .prepare_cached(queries::SELECT_FOLLOWING_NAMES)?
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        let followers = db
            .prepare_cached(queries::SELECT_FOLLOWER_NAMES)?
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        let liked = |filter: &str| -> rusqlite::Result<Vec<PostView>> {
            let sql = format!(
                "{} where p.parent {} and p.id in (select post from likes where user = ?) \
                 order by p.time desc, p.id desc",
                queries::SELECT_POST_BASE, filter
            );
            db.prepare_cached(&sql)?.query_map(params![id], post_from_row)?.collect()
        };
        let likes = liked("is null")?;
        let comment_likes = liked("is not null")?;
        Ok(Some(UserDetail { username, following, followers, likes, comment_likes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ExecutorConnection {
        let (exec, conn) = DbExecutor::create(":memory:").unwrap();
        std::thread::spawn(move || exec.run());
        conn
    }

    async fn add_user(db: &ExecutorConnection, name: &str) -> i64 {
        db.create_user(name.into(), format!("{name}@example.com"), "hash".into())
            .await
            .unwrap()
    }

    async fn add_post(db: &ExecutorConnection, board: i64, author: i64, content: &str) -> i64 {
        db.create_post(board, author, content.into(), String::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn comment_inherits_parent_board() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let general = db.create_board("General".into(), String::new(), None).await.unwrap();
        let post = add_post(&db, general, alice, "hello").await;

        let comment = db
            .create_comment(post, alice, "hi there".into(), String::new())
            .await
            .unwrap()
            .expect("parent exists");
        assert_eq!(comment.parent, Some(post));
        assert_eq!(comment.board_id, general);
        assert_eq!(comment.board, "General");
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_rejected() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let res = db
            .create_comment(42, alice, "orphan".into(), String::new())
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn comments_never_appear_in_feeds() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let board = db.create_board("General".into(), String::new(), None).await.unwrap();
        let post = add_post(&db, board, alice, "top-level").await;
        db.create_comment(post, alice, "reply".into(), String::new())
            .await
            .unwrap()
            .unwrap();

        let feed = db
            .list_posts(FeedScope::Board(board), SortKey::NewOld, 1)
            .await
            .unwrap();
        assert_eq!(feed.total, 1);
        assert_eq!(feed.posts[0].id, post);
        assert_eq!(feed.posts[0].num_comments, 1);
    }

    #[tokio::test]
    async fn follow_toggle_roundtrip() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let bob = add_user(&db, "bob").await;

        assert_eq!(db.toggle_follow(alice, bob).await.unwrap(), Some(true));
        assert_eq!(db.toggle_follow(alice, bob).await.unwrap(), Some(false));
        let profile = db.get_profile("bob".into(), Some(alice)).await.unwrap().unwrap();
        assert_eq!(profile.followers, 0);
        assert!(!profile.viewer_follows);
    }

    #[tokio::test]
    async fn self_follow_is_rejected() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        assert_eq!(db.toggle_follow(alice, alice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn like_toggle_roundtrip() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let bob = add_user(&db, "bob").await;
        let board = db.create_board("General".into(), String::new(), None).await.unwrap();
        let post = add_post(&db, board, alice, "hello").await;

        assert_eq!(db.toggle_like(bob, post).await.unwrap(), Some(true));
        assert_eq!(db.get_post(post).await.unwrap().unwrap().num_likes, 1);
        assert_eq!(db.toggle_like(bob, post).await.unwrap(), Some(false));
        assert_eq!(db.get_post(post).await.unwrap().unwrap().num_likes, 0);
    }

    #[tokio::test]
    async fn like_on_missing_post_is_rejected() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        assert_eq!(db.toggle_like(alice, 7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn feed_sorted_by_likes_desc() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let bob = add_user(&db, "bob").await;
        let carol = add_user(&db, "carol").await;
        let board = db.create_board("General".into(), String::new(), None).await.unwrap();

        let p1 = add_post(&db, board, alice, "one").await;
        let p2 = add_post(&db, board, alice, "two").await;
        let _p3 = add_post(&db, board, alice, "three").await;
        db.toggle_like(bob, p1).await.unwrap();
        db.toggle_like(carol, p1).await.unwrap();
        db.toggle_like(bob, p2).await.unwrap();

        let feed = db
            .list_posts(FeedScope::Board(board), SortKey::LikesHighLow, 1)
            .await
            .unwrap();
        let likes: Vec<i64> = feed.posts.iter().map(|p| p.num_likes).collect();
        assert_eq!(likes, vec![2, 1, 0]);
        for pair in feed.posts.windows(2) {
            assert!(pair[0].num_likes >= pair[1].num_likes);
        }
    }

    #[tokio::test]
    async fn page_past_end_clamps_to_last() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let board = db.create_board("General".into(), String::new(), None).await.unwrap();
        for i in 0..25 {
            add_post(&db, board, alice, &format!("post {i}")).await;
        }

        let feed = db
            .list_posts(FeedScope::Board(board), SortKey::NewOld, 99)
            .await
            .unwrap();
        assert_eq!(feed.page, 3);
        assert_eq!(feed.num_pages, 3);
        assert_eq!(feed.posts.len(), 5);

        // Page 0 clamps to the first page; an empty board yields one empty page.
        let first = db
            .list_posts(FeedScope::Board(board), SortKey::NewOld, 0)
            .await
            .unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.posts.len(), 10);

        let empty = db.create_board("Empty".into(), String::new(), None).await.unwrap();
        let none = db
            .list_posts(FeedScope::Board(empty), SortKey::NewOld, 5)
            .await
            .unwrap();
        assert_eq!(none.page, 1);
        assert_eq!(none.num_pages, 1);
        assert!(none.posts.is_empty());
    }

    #[tokio::test]
    async fn following_feed_shows_newest_first() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let bob = add_user(&db, "bob").await;
        let carol = add_user(&db, "carol").await;
        let board = db.create_board("General".into(), String::new(), None).await.unwrap();

        db.toggle_follow(alice, bob).await.unwrap();
        add_post(&db, board, bob, "first").await;
        add_post(&db, board, carol, "not followed").await;

        let feed = db
            .list_posts(FeedScope::Following(alice), SortKey::NewOld, 1)
            .await
            .unwrap();
        assert_eq!(feed.total, 1);
        assert_eq!(feed.posts[0].author, "bob");

        let newest = add_post(&db, board, bob, "second").await;
        let feed = db
            .list_posts(FeedScope::Following(alice), SortKey::NewOld, 1)
            .await
            .unwrap();
        assert_eq!(feed.posts[0].id, newest);
        assert_eq!(feed.posts[0].content, "second");
    }

    #[tokio::test]
    async fn user_detail_splits_post_and_comment_likes() {
        let db = store();
        let alice = add_user(&db, "alice").await;
        let bob = add_user(&db, "bob").await;
        let board = db.create_board("General".into(), String::new(), None).await.unwrap();
        let post = add_post(&db, board, alice, "hello").await;
        let comment = db
            .create_comment(post, alice, "reply".into(), String::new())
            .await
            .unwrap()
            .unwrap();

        db.toggle_like(bob, post).await.unwrap();
        db.toggle_like(bob, comment.id).await.unwrap();
        db.toggle_follow(bob, alice).await.unwrap();

        let detail = db.user_detail("bob".into()).await.unwrap().unwrap();
        assert_eq!(detail.following, vec!["alice"]);
        assert!(detail.followers.is_empty());
        assert_eq!(detail.likes.len(), 1);
        assert_eq!(detail.likes[0].id, post);
        assert_eq!(detail.comment_likes.len(), 1);
        assert_eq!(detail.comment_likes[0].id, comment.id);

        let alice_detail = db.user_detail("alice".into()).await.unwrap().unwrap();
        assert_eq!(alice_detail.followers, vec!["bob"]);
    }

    #[tokio::test]
    async fn duplicate_username_hits_constraint() {
        let db = store();
        add_user(&db, "alice").await;
        let err = db
            .create_user("alice".into(), "other@example.com".into(), "hash".into())
            .await
            .unwrap_err();
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
