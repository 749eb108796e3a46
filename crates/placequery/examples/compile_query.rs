//! Compiling queries without a warehouse
//!
//! This example walks the state through a few edits and prints the SQL the
//! compiler produces for each shape:
//! - A circle count
//! - A per-type breakdown inside a pasted polygon
//! - An H3 density grid

use placequery::{
    AppConfigBuilder, ApplicationRunState, CompileRequest, LatLng, QueryCompiler, ResolveOutcome,
    SearchMode, StateChange,
    resolve::{resolve_circle, resolve_polygon},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfigBuilder::new()
        .project_id("demo-project")
        .location("United Kingdom")
        .build()?;
    let compiler = QueryCompiler::new(&config.location);
    let mut state = ApplicationRunState::new(config.defaults);

    // Circle around Trafalgar Square
    state.apply(StateChange::SetCenter(LatLng::new(51.508, -0.128)))?;
    state.apply(StateChange::AddPlaceType("restaurant".into()))?;
    if let ResolveOutcome::Ready(params) = resolve_circle(state.center(), state.radius_m()) {
        print_query(&compiler, &state, &params);
    }

    // Two types inside a pasted polygon
    state.apply(StateChange::SetMode(SearchMode::Polygon))?;
    state.apply(StateChange::PasteWkt(
        "POLYGON((-0.2 51.4, -0.2 51.6, 0.1 51.6, 0.1 51.4, -0.2 51.4))".into(),
    ))?;
    state.apply(StateChange::AddPlaceType("cafe".into()))?;
    state.apply(StateChange::AddPlaceType("book_store".into()))?;
    if let ResolveOutcome::Ready(params) = resolve_polygon(state.polygon()) {
        print_query(&compiler, &state, &params);

        // Same polygon, bucketed into resolution 9 cells
        state.apply(StateChange::SetH3Density(true))?;
        state.apply(StateChange::SetH3Resolution(9))?;
        print_query(&compiler, &state, &params);
    }

    Ok(())
}

fn print_query(
    compiler: &QueryCompiler<'_>,
    state: &ApplicationRunState,
    params: &placequery::SearchParams,
) {
    let query = compiler.compile(&CompileRequest {
        params,
        filters: state.filters(),
        h3_density: state.h3_density(),
        function_mode: state.mode().is_function(),
        h3_resolution: state.h3_resolution(),
        radius_m: state.radius_m(),
    });
    println!("-- {} ({})", query.shape, state.mode());
    println!("{}\n", query.sql);
}
