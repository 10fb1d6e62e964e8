use rocket::Route;

pub const BANNER: &str = "CloudBase Voting Backend";

pub fn routes() -> Vec<Route> {
    routes![index]
}

#[get("/")]
fn index() -> &'static str {
    BANNER
}
