fn main() {
    raster::cli::run();
}
