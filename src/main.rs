fn main() {
    if let Err(e) = tfsc_dashboard_lib::run() {
        eprintln!("启动失败: {:#}", e);
        std::process::exit(1);
    }
}
