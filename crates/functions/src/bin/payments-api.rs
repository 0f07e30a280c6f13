//! `/api/payments` as a serverless function.

#![cfg_attr(not(test), forbid(unsafe_code))]

use ekart_api::routes::RouteGroup;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    ekart_functions::run(RouteGroup::Payments).await
}
