//! Route definitions for the Farm Management Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/farms", farm_routes())
        .nest("/batches", batch_routes())
        .nest("/logs", log_routes())
        .nest("/sales", sale_routes())
        .nest("/tasks", task_routes())
        .nest("/inventory", inventory_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Farms and everything scoped to one farm
fn farm_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_farms).post(handlers::create_farm))
        .route(
            "/:farm_id",
            get(handlers::get_farm)
                .put(handlers::update_farm)
                .delete(handlers::delete_farm),
        )
        .route(
            "/:farm_id/batches",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route(
            "/:farm_id/sales",
            get(handlers::list_sales).post(handlers::record_sale),
        )
        .route(
            "/:farm_id/tasks",
            get(handlers::list_farm_tasks).post(handlers::create_task),
        )
        .route(
            "/:farm_id/inventory",
            get(handlers::list_inventory_items).post(handlers::create_inventory_item),
        )
        .route(
            "/:farm_id/inventory/purchases",
            post(handlers::record_inventory_purchase),
        )
        .route(
            "/:farm_id/inventory/low-stock",
            get(handlers::list_low_stock_items),
        )
        .route("/:farm_id/analytics/dashboard", get(handlers::get_dashboard))
        .route("/:farm_id/analytics/revenue", get(handlers::get_revenue_chart))
        .route("/:farm_id/analytics/production", get(handlers::get_production_chart))
        .route("/:farm_id/analytics/stock", get(handlers::get_stock_chart))
        .route(
            "/:farm_id/analytics/usage/:item_id",
            get(handlers::get_usage_chart),
        )
        .route("/:farm_id/reports/sales", get(handlers::get_sales_report))
        .route("/:farm_id/reports/usage", get(handlers::get_usage_report))
}

/// Batch routes
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:batch_id",
            get(handlers::get_batch)
                .put(handlers::update_batch)
                .delete(handlers::delete_batch),
        )
        .route("/:batch_id/close", post(handlers::close_batch))
        .route(
            "/:batch_id/logs",
            get(handlers::list_daily_logs).post(handlers::create_daily_log),
        )
        .route(
            "/:batch_id/health-records",
            get(handlers::list_health_records).post(handlers::create_health_record),
        )
}

fn log_routes() -> Router<AppState> {
    Router::new().route("/:log_id", get(handlers::get_daily_log))
}

fn sale_routes() -> Router<AppState> {
    Router::new().route("/:sale_id", get(handlers::get_sale))
}

/// Task routes
fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/mine", get(handlers::list_my_tasks))
        .route(
            "/:task_id",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .route("/:task_id/status", post(handlers::transition_task))
}

/// Item-level inventory routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/items/:item_id",
            get(handlers::get_inventory_item).put(handlers::update_inventory_item),
        )
        .route(
            "/items/:item_id/transactions",
            get(handlers::list_item_transactions),
        )
        .route(
            "/items/:item_id/availability",
            get(handlers::check_item_availability),
        )
        .route("/items/:item_id/usage", post(handlers::record_item_usage))
}
