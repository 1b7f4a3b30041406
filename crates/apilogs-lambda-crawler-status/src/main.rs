//! AWS Lambda function for checking the access-log crawler status.

use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    apilogs_lambda_crawler_status::run().await
}
