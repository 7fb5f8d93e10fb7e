use askama::Template;

use crate::database::models::{Board, FeedPage, PostView, ProfileView};

use self::models::Flash;

pub mod models;

#[derive(Template)]
#[template(path = "index.html")]
pub struct Index {
    pub flash: Flash,
    pub boards: Vec<Board>,
    pub can_create: bool,
    pub user: Option<String>,
}

#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardPage {
    pub flash: Flash,
    pub board: Board,
    pub page: FeedPage,
    pub sort: String,
    pub user: Option<String>,
}

#[derive(Template)]
#[template(path = "comments.html")]
pub struct CommentsPage {
    pub post: PostView,
    pub comments: Vec<PostView>,
    pub user: Option<String>,
}

#[derive(Template)]
#[template(path = "user.html")]
pub struct UserPage {
    pub flash: Flash,
    pub profile: ProfileView,
    pub page: FeedPage,
    pub own_profile: bool,
    pub follow_button: &'static str,
    pub followers_text: String,
    pub following_text: String,
    pub user: Option<String>,
}

#[derive(Template)]
#[template(path = "following.html")]
pub struct FollowingPage {
    pub page: FeedPage,
    pub user: Option<String>,
}

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct Login {
    pub flash: Flash,
    pub user: Option<String>,
}

#[derive(Template, Default)]
#[template(path = "register.html")]
pub struct Register {
    pub flash: Flash,
    pub user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(id: i64, author: &str) -> PostView {
        PostView {
            id,
            author: author.into(),
            board_id: 1,
            board: "General".into(),
            parent: None,
            content: "hello".into(),
            image_link: String::new(),
            num_likes: 0,
            num_comments: 0,
            time: 0,
        }
    }

    fn sample_board_page(sort: &str, viewer: Option<&str>) -> BoardPage {
        BoardPage {
            flash: Flash::None,
            board: Board {
                id: 1,
                name: "General".into(),
                description: String::new(),
                thumbnail: None,
            },
            page: FeedPage {
                posts: vec![sample_post(7, "alice")],
                page: 1,
                num_pages: 1,
                total: 1,
            },
            sort: sort.into(),
            user: viewer.map(String::from),
        }
    }

    #[test]
    fn board_page_marks_the_active_sort() {
        let html = sample_board_page("likes_high_low", None).render().unwrap();
        assert!(html.contains(r#"value="likes_high_low" selected"#));
        assert!(!html.contains(r#"value="comments_high_low" selected"#));

        let html = sample_board_page("", None).render().unwrap();
        assert!(html.contains(r#"value="" selected"#));
    }

    #[test]
    fn signed_in_listings_offer_like_and_edit_controls() {
        let html = sample_board_page("", Some("alice")).render().unwrap();
        assert!(html.contains(r#"class="like" data-id="7""#));
        assert!(html.contains(r#"class="edit" data-id="7""#));

        // Edit is reserved for the author.
        let html = sample_board_page("", Some("bob")).render().unwrap();
        assert!(html.contains(r#"class="like" data-id="7""#));
        assert!(!html.contains(r#"class="edit""#));

        let html = sample_board_page("", None).render().unwrap();
        assert!(!html.contains(r#"class="like""#));
        assert!(!html.contains(r#"class="edit""#));
    }

    #[test]
    fn comments_page_wires_comment_controls() {
        let mut comment = sample_post(9, "bob");
        comment.parent = Some(7);
        let html = CommentsPage {
            post: sample_post(7, "alice"),
            comments: vec![comment],
            user: Some("bob".into()),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"class="like" data-id="7""#));
        assert!(html.contains(r#"class="like" data-id="9""#));
        assert!(html.contains(r#"class="edit" data-id="9""#));
        assert!(!html.contains(r#"class="edit" data-id="7""#));
    }
}
