use crate::server::ServerRouter;

mod timeline;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(users::routes())
        .merge(timeline::routes())
}
