//! AWS Lambda function for Firehose access-log enrichment.

use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    apilogs_lambda_enricher::run().await
}
