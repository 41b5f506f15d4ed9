/// Image Service - HTTP server
///
/// Accepts image uploads, produces resized variants concurrently, and
/// streams each one into object storage.
use actix_cors::Cors;
use actix_web::{middleware as actix_middleware, web, App, HttpResponse, HttpServer};
use image_service::models::MessageResponse;
use image_service::services::{ImagePipeline, PipelineConfig, S3Store};
use image_service::{handlers, Config};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration from environment
    let config = Config::from_env();
    let bind_address = format!("{}:{}", config.app.host, config.app.port);

    // Fail fast on invalid storage configuration; never surfaced per-request
    let store = S3Store::from_config(&config.s3).await.map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("failed to initialize object store: {e}"),
        )
    })?;

    let mut pipeline_config =
        PipelineConfig::new(config.s3.bucket.clone(), config.upload.path_prefix.clone());
    pipeline_config.jpeg_quality = config.upload.jpeg_quality;
    let pipeline = Arc::new(ImagePipeline::new(Arc::new(store), pipeline_config));

    tracing::info!(env = %config.app.env, "image service starting HTTP server on {bind_address}");

    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_config.clone()))
            .app_data(web::Data::new(pipeline.clone()))
            .wrap(build_cors(&server_config.cors.allowed_origins))
            .wrap(actix_middleware::Logger::default())
            .route("/", web::get().to(welcome))
            .route(
                "/api/v1/health",
                web::get()
                    .to(|| async { HttpResponse::Ok().json(serde_json::json!({"status": "ok"})) }),
            )
            .route(
                "/api/v1/openapi.json",
                web::get().to(|| async {
                    use utoipa::OpenApi;
                    HttpResponse::Ok()
                        .content_type("application/json")
                        .json(image_service::openapi::ApiDoc::openapi())
                }),
            )
            .service(
                web::scope("/api/v1").service(
                    web::scope("/images").route("", web::post().to(handlers::upload_image)),
                ),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}

/// Handler for the root route, just a basic welcome message
async fn welcome() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::new("Welcome to the image service."))
}

fn build_cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.iter().any(|origin| origin == "*") {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        let mut cors = Cors::default().allow_any_method().allow_any_header();
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
        cors
    }
}
