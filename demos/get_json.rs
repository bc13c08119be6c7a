use cowl::{Method, RequestOptions, request};
use serde_json::json;
use snafu::prelude::*;

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let base = std::env::var("BASE_URL").whatever_context("Failed to get BASE_URL")?;

    let response = request(format!("{base}/get"))
        .await
        .whatever_context("GET request failed")?;
    println!(
        "{} {} -> {:?}",
        response.status_code, response.status_text, response.data
    );

    let options = RequestOptions::builder(format!("{base}/put"))
        .method(Method::PUT)
        .body(json!({"testing": true}))
        .build();
    let response = request(options)
        .await
        .whatever_context("PUT request failed")?;
    println!("{:?}", response.data);

    Ok(())
}
