//! AWS Lambda function for starting the access-log crawler.

use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    apilogs_lambda_crawler_starter::run().await
}
