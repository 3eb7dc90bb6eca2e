use clap::Parser;
use listenable_call::utils::{logger, validation::Validate};
use listenable_call::{
    CliArgs, Endpoint, FutureError, RequestBody, RequestBodyConverter, RestClient, StringConverter,
};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = args.client_config()?;
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let client = RestClient::from_config(&config)?;
    let mut endpoint = Endpoint::new(args.http_method()?, args.path.clone());
    if let Some(data) = &args.data {
        let body: RequestBody = StringConverter.encode(data)?;
        endpoint = endpoint.body(body);
    }

    tracing::info!("{} {}", endpoint.method(), client.base_url().join(endpoint.path())?);

    let result = if args.response {
        client
            .response(&endpoint, StringConverter)
            .get()
            .map(|response| {
                println!("HTTP {} {}", response.code(), response.message());
                for (name, value) in response.headers() {
                    println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
                }
                println!();
                match response.body() {
                    Some(body) => println!("{}", body),
                    None => println!("{}", response.error_body().map(|b| b.text()).unwrap_or_default()),
                }
            })
    } else {
        client
            .body(&endpoint, StringConverter)
            .get()
            .map(|body| println!("{}", body))
    };

    if let Err(e) = result {
        let exit_code = match &e {
            FutureError::ExecutionError(cause) => {
                tracing::error!("Request failed: {}", cause);
                eprintln!("❌ {}", cause.user_friendly_message());
                if cause.is_http() {
                    2
                } else {
                    3
                }
            }
            FutureError::Cancelled | FutureError::Timeout(_) => {
                eprintln!("❌ {}", e);
                3
            }
        };
        std::process::exit(exit_code);
    }

    Ok(())
}
