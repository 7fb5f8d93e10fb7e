use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub thumbnail: Option<String>,
}

/// A post (or comment, when `parent` is set) joined with its author and
/// board names and the aggregate like/comment counts.
#[derive(Debug, Clone)]
pub struct PostView {
    pub id: i64,
    pub author: String,
    pub board_id: i64,
    pub board: String,
    pub parent: Option<i64>,
    pub content: String,
    pub image_link: String,
    pub num_likes: i64,
    pub num_comments: i64,
    pub time: i64,
}

impl PostView {
    pub fn timestamp(&self) -> String {
        format_timestamp(self.time)
    }

    pub fn to_json(&self) -> Value {
        match self.parent {
            Some(parent) => json!({
                "id": self.id,
                "author": self.author,
                "post_id": parent,
                "content": self.content,
                "image_link": self.image_link,
                "num_likes": self.num_likes,
                "timestamp": self.timestamp(),
            }),
            None => json!({
                "id": self.id,
                "author": self.author,
                "board": self.board,
                "content": self.content,
                "image_link": self.image_link,
                "num_likes": self.num_likes,
                "timestamp": self.timestamp(),
            }),
        }
    }
}

/// One page of a feed, clamped to the valid page range.
#[derive(Debug)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub page: usize,
    pub num_pages: usize,
    pub total: usize,
}

impl FeedPage {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }
}

/// Feed scope: which top-level posts are eligible.
#[derive(Debug, Clone, Copy)]
pub enum FeedScope {
    Board(i64),
    Author(i64),
    /// Posts authored by anyone the given user follows.
    Following(i64),
}

impl FeedScope {
    pub fn where_clause(self) -> &'static str {
        match self {
            FeedScope::Board(_) => "p.board = ?1",
            FeedScope::Author(_) => "p.author = ?1",
            FeedScope::Following(_) => {
                "p.author in (select followed from follows where follower = ?1)"
            }
        }
    }

    pub fn param(self) -> i64 {
        match self {
            FeedScope::Board(id) | FeedScope::Author(id) | FeedScope::Following(id) => id,
        }
    }
}

/// Feed ordering, parsed from the `?q=` query parameter. Unknown or
/// missing values fall back to newest-first. Every ordering carries a
/// time/id tie-break so page contents stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    NewOld,
    OldNew,
    LikesHighLow,
    LikesLowHigh,
    CommentsHighLow,
    CommentsLowHigh,
}

impl SortKey {
    pub fn from_query(q: Option<&str>) -> Self {
        match q.unwrap_or("") {
            "likes_high_low" => SortKey::LikesHighLow,
            "likes_low_high" => SortKey::LikesLowHigh,
            "comments_high_low" => SortKey::CommentsHighLow,
            "comments_low_high" => SortKey::CommentsLowHigh,
            "timestamp_old_new" => SortKey::OldNew,
            _ => SortKey::NewOld,
        }
    }

    pub fn order_clause(self) -> &'static str {
        match self {
            SortKey::NewOld => "p.time desc, p.id desc",
            SortKey::OldNew => "p.time asc, p.id asc",
            SortKey::LikesHighLow => "num_likes desc, p.time desc, p.id desc",
            SortKey::LikesLowHigh => "num_likes asc, p.time desc, p.id desc",
            SortKey::CommentsHighLow => "num_comments desc, p.time desc, p.id desc",
            SortKey::CommentsLowHigh => "num_comments asc, p.time desc, p.id desc",
        }
    }
}

/// Profile header data for the HTML user page.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub followers: i64,
    pub following: i64,
    pub viewer_follows: bool,
}

/// Full user serialization for the JSON API.
#[derive(Debug)]
pub struct UserDetail {
    pub username: String,
    pub following: Vec<String>,
    pub followers: Vec<String>,
    pub likes: Vec<PostView>,
    pub comment_likes: Vec<PostView>,
}

impl UserDetail {
    pub fn to_json(&self) -> Value {
        json!({
            "username": self.username,
            "following": self.following,
            "followers": self.followers,
            "likes": self.likes.iter().map(PostView::to_json).collect::<Vec<_>>(),
            "comment_likes": self.comment_likes.iter().map(PostView::to_json).collect::<Vec<_>>(),
        })
    }
}

pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|t| t.format("%b %-d %Y, %-I:%M %p").to_string())
        .unwrap_or_default()
}
