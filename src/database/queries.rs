pub static INSERT_USER: &str =
    "insert into users(username, email, password_hash, time) values (?, ?, ?, ?)";
pub static SELECT_USER_CRED: &str =
    "select id, password_hash from users where username = ?";
pub static SELECT_USER_ID: &str = "select id from users where username = ?";

pub static INSERT_BOARD: &str =
    "insert into boards(name, description, thumbnail) values (?, ?, ?)";
pub static SELECT_BOARDS: &str =
    "select id, name, description, thumbnail from boards order by name asc";
pub static SELECT_BOARD: &str =
    "select id, name, description, thumbnail from boards where id = ?";

pub static INSERT_POST: &str =
    "insert into posts(board, author, parent, content, image_link, time) values (?, ?, ?, ?, ?, ?)";
pub static SELECT_PARENT_BOARD: &str = "select board from posts where id = ?";

// Shared post projection; callers append a where clause and ordering.
pub static SELECT_POST_BASE: &str = "select p.id, u.username, b.id, b.name, p.parent, \
     p.content, p.image_link, p.time, \
     (select count(*) from likes l where l.post = p.id) as num_likes, \
     (select count(*) from posts c where c.parent = p.id) as num_comments \
     from posts p \
     join users u on u.id = p.author \
     join boards b on b.id = p.board";

pub static COUNT_FEED: &str = "select count(*) from posts p where p.parent is null and ";

pub static UPDATE_POST_CONTENT: &str = "update posts set content = ? where id = ?";
pub static UPDATE_POST_IMAGE: &str = "update posts set image_link = ? where id = ?";
pub static UPDATE_POST_BOTH: &str = "update posts set content = ?, image_link = ? where id = ?";
pub static CHECK_POST: &str = "select 1 from posts where id = ?";

pub static DELETE_FOLLOW: &str = "delete from follows where follower = ? and followed = ?";
pub static INSERT_FOLLOW: &str = "insert into follows(follower, followed) values (?, ?)";
pub static COUNT_FOLLOWERS: &str = "select count(*) from follows where followed = ?";
pub static COUNT_FOLLOWING: &str = "select count(*) from follows where follower = ?";
pub static CHECK_FOLLOW: &str = "select 1 from follows where follower = ? and followed = ?";
pub static SELECT_FOLLOWING_NAMES: &str = "select u.username from follows f \
     join users u on u.id = f.followed where f.follower = ? order by u.username";
pub static SELECT_FOLLOWER_NAMES: &str = "select u.username from follows f \
     join users u on u.id = f.follower where f.followed = ? order by u.username";

pub static DELETE_LIKE: &str = "delete from likes where user = ? and post = ?";
pub static INSERT_LIKE: &str = "insert into likes(user, post) values (?, ?)";
