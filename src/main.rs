#[actix_web::main]
async fn main() -> std::io::Result<()> {
    keyword_consolidator_lib::run().await
}
