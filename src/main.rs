fn main() {
    qre_solver::cli::run();
}
